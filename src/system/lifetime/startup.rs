//! Backend initialization
//!
//! Each backing service is probed with a bounded retry policy before the
//! engine is built. Running out of attempts is fatal for the process.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{
    BloomConfig, BloomExistenceFilter, CacheStore, ExistenceFilter, MokaCacheStore,
    RedisCacheStore, RedisConnection, RedisExistenceFilter,
};
use crate::config::{CacheBackendKind, StaticConfig};
use crate::errors::{Backend, Result, ShortdigestError};
use crate::storage::{DurableStore, SeaOrmStore};
use crate::utils::retry::{RetryPolicy, retry_with_backoff};

/// Handles to every initialized backing service.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn DurableStore>,
    pub cache: Arc<dyn CacheStore>,
    pub filter: Arc<dyn ExistenceFilter>,
}

/// Connect and prepare the durable store, the cache and the existence filter.
///
/// Schema creation and filter reservation are idempotent, so this is safe to
/// run on every start and from several processes at once.
pub async fn init_db(config: &StaticConfig) -> Result<Backends> {
    let policy = config.startup.retry_policy();

    let store = probe(Backend::Database, policy, || async move {
        let store = SeaOrmStore::connect(&config.database).await?;
        store.ping().await?;
        store.migrate().await?;
        Ok(store)
    })
    .await?;
    info!("Durable store ready ({})", store.backend_name());

    let bloom = BloomConfig {
        capacity: config.filter.capacity,
        fp_rate: config.filter.error_rate,
    };

    let (cache, filter): (Arc<dyn CacheStore>, Arc<dyn ExistenceFilter>) =
        match config.cache.backend {
            CacheBackendKind::Redis => {
                let redis = probe(Backend::Cache, policy, || async move {
                    let redis = RedisConnection::connect(&config.cache.redis).await?;
                    redis.ping(Backend::Cache).await?;
                    Ok(redis)
                })
                .await?;
                (
                    Arc::new(RedisCacheStore::new(redis.clone())),
                    Arc::new(RedisExistenceFilter::new(redis)),
                )
            }
            CacheBackendKind::Memory => {
                warn!("Using in-process cache and filter; state is not shared between processes");
                (
                    Arc::new(MokaCacheStore::new(config.cache.memory.max_capacity)),
                    Arc::new(BloomExistenceFilter::new(bloom)),
                )
            }
        };
    info!("Cache ready ({})", cache.name());

    probe(Backend::Filter, policy, || filter.provision(&bloom)).await?;
    info!(
        "Existence filter ready ({}, capacity {}, error rate {})",
        filter.name(),
        bloom.capacity,
        bloom.fp_rate
    );

    Ok(Backends {
        store: Arc::new(store),
        cache,
        filter,
    })
}

/// Retry `op` while it reports a backend failure; anything else (bad config)
/// is returned as-is on the first attempt.
async fn probe<T, F, Fut>(backend: Backend, policy: RetryPolicy, op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let name = format!("{} startup probe", backend);
    retry_with_backoff(
        &name,
        policy,
        |e: &ShortdigestError| e.is_backend_failure(),
        op,
    )
    .await
    .map_err(|exhausted| {
        if exhausted.error.is_backend_failure() {
            ShortdigestError::startup(backend, exhausted.attempts, exhausted.error)
        } else {
            exhausted.error
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_probe_exhaustion_is_startup_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = probe(Backend::Cache, RetryPolicy::new(3, 1, 2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ShortdigestError::backend_msg(Backend::Cache, "refused")) }
        })
        .await;

        match result.unwrap_err() {
            ShortdigestError::Startup {
                backend, attempts, ..
            } => {
                assert_eq!(backend, Backend::Cache);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_probe_config_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = probe(Backend::Database, RetryPolicy::new(5, 1, 2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ShortdigestError::config("bad url")) }
        })
        .await;

        assert!(matches!(result, Err(ShortdigestError::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probe_recovers() {
        let calls = AtomicU32::new(0);
        let value = probe(Backend::Filter, RetryPolicy::new(5, 1, 2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ShortdigestError::backend_msg(Backend::Filter, "loading"))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 1);
    }
}
