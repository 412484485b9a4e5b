use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use tracing::{debug, trace};

use crate::cache::CacheStore;
use crate::context::OpContext;
use crate::errors::Result;

#[derive(Debug, Clone)]
struct CachedUrl {
    url: String,
    ttl: Duration,
}

/// 按条目 TTL 过期，覆盖写入时重新计时
struct PerEntryExpiry;

impl Expiry<String, CachedUrl> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedUrl,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedUrl,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process digest → URL cache.
pub struct MokaCacheStore {
    inner: Cache<String, CachedUrl>,
}

impl MokaCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryExpiry)
            .build();

        debug!("MokaCacheStore initialized with max capacity: {}", max_capacity);
        Self { inner }
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, _ctx: &OpContext, digest: &str) -> Result<Option<String>> {
        Ok(self.inner.get(digest).await.map(|cached| cached.url))
    }

    async fn set_with_ttl(
        &self,
        _ctx: &OpContext,
        digest: &str,
        url: &str,
        ttl: Duration,
    ) -> Result<()> {
        self.inner
            .insert(
                digest.to_string(),
                CachedUrl {
                    url: url.to_string(),
                    ttl,
                },
            )
            .await;
        trace!("Cached {} for {:?}", digest, ttl);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
