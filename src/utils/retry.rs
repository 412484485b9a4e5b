//! 有界重试策略
//!
//! 固定尝试次数 + 指数退避（带抖动），每次重试都会记录日志。
//! 启动期的后端探活和运行期的瞬时数据库错误共用这一套策略。

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Bounded retry policy: `attempts` is the total number of tries, not retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 8,
            base_delay_ms: 100,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(calculate_backoff(
            retry,
            self.base_delay_ms,
            self.max_delay_ms,
        ))
    }
}

/// Every attempt failed; `error` is the last one seen.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub error: E,
}

/// 计算指数退避延迟（带抖动）
fn calculate_backoff(retry: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exp_delay = base_ms.saturating_mul(2u64.saturating_pow(retry.saturating_sub(1)));
    let capped = exp_delay.min(max_ms);
    // 添加 0-25% 的随机抖动，避免惊群效应
    let jitter = rand::random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}

/// Run `operation` until it succeeds, fails with an error `retryable` rejects,
/// or the policy runs out of attempts.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    operation_name: &str,
    policy: RetryPolicy,
    retryable: P,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "Operation '{}' succeeded after {} attempts",
                        operation_name, attempt
                    );
                }
                return Ok(value);
            }
            Err(e) if retryable(&e) && attempt < attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}; retrying in {} ms",
                    operation_name,
                    attempt,
                    attempts,
                    e,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if retryable(&e) {
                    warn!(
                        "Operation '{}' failed (attempt {}/{}): {}; giving up",
                        operation_name, attempt, attempts, e
                    );
                } else {
                    debug!(
                        "Operation '{}' failed with non-retryable error: {}",
                        operation_name, e
                    );
                }
                return Err(RetryExhausted { attempts: attempt, error: e });
            }
        }
    }
}
