//! Per-request cancellation and deadline
//!
//! Every engine call takes an [`OpContext`]. Backend calls are wrapped in
//! [`OpContext::run`], so an expired deadline or a cancelled token aborts the
//! in-flight call instead of waiting on it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Backend, Result, ShortdigestError};

#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl OpContext {
    /// No deadline, never cancelled unless a token is attached later.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach an external token, e.g. one that fires when the client disconnects.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Shorten the deadline; an existing earlier deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `fut` until it finishes, the deadline passes or the token fires.
    ///
    /// Expiry and cancellation are reported as `BackendUnavailable` for `backend`.
    pub async fn run<T, F>(&self, backend: Backend, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ShortdigestError::backend_msg(backend, "operation cancelled"));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ShortdigestError::backend_msg(backend, "deadline exceeded"));
        }

        let sleep = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("{} call aborted: cancelled", backend);
                Err(ShortdigestError::backend_msg(backend, "operation cancelled"))
            }
            _ = sleep => {
                debug!("{} call aborted: deadline exceeded", backend);
                Err(ShortdigestError::backend_msg(backend, "deadline exceeded"))
            }
            result = fut => result,
        }
    }
}
