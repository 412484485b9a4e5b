//! URL registration and digest resolution
//!
//! The durable store's uniqueness constraints are the final arbiter for
//! every registration. The existence filter only decides whether a durable
//! read is needed before the insert, and the cache only short-circuits reads.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStore, ExistenceFilter, FilterSet};
use crate::config::StaticConfig;
use crate::context::OpContext;
use crate::digest::{DigestEncoder, Xxh64Encoder};
use crate::errors::{Result, ShortdigestError};
use crate::storage::{DurableStore, InsertOutcome, UrlRecord};
use crate::system::Backends;

/// How many times a colliding digest may be regenerated from a salted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPolicy {
    pub max_salted_retries: u32,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        Self {
            max_salted_retries: 1,
        }
    }
}

impl CollisionPolicy {
    /// `url` followed by the current UTC time with nanosecond precision.
    pub fn salt(url: &str) -> String {
        format!(
            "{}{}",
            url,
            Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
        )
    }
}

pub struct RegistrationEngine {
    store: Arc<dyn DurableStore>,
    cache: Arc<dyn CacheStore>,
    filter: Arc<dyn ExistenceFilter>,
    encoder: Arc<dyn DigestEncoder>,
    cache_ttl: Duration,
    collision: CollisionPolicy,
    populate_on_miss: bool,
}

impl RegistrationEngine {
    pub fn new(
        store: Arc<dyn DurableStore>,
        cache: Arc<dyn CacheStore>,
        filter: Arc<dyn ExistenceFilter>,
    ) -> Self {
        Self {
            store,
            cache,
            filter,
            encoder: Arc::new(Xxh64Encoder),
            cache_ttl: Duration::from_secs(2 * 60 * 60),
            collision: CollisionPolicy::default(),
            populate_on_miss: false,
        }
    }

    /// Build from initialized backends, taking TTL and policies from `config`.
    pub fn from_backends(backends: Backends, config: &StaticConfig) -> Self {
        Self::new(backends.store, backends.cache, backends.filter)
            .with_cache_ttl(config.cache.ttl())
            .with_collision_policy(CollisionPolicy {
                max_salted_retries: config.registration.max_salted_retries,
            })
            .with_populate_on_miss(config.cache.populate_on_miss)
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn DigestEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    pub fn with_populate_on_miss(mut self, enabled: bool) -> Self {
        self.populate_on_miss = enabled;
        self
    }

    /// Register `url` and return its digest.
    ///
    /// A URL that is already registered fails with `AlreadyExists`, which
    /// carries the digest it was first registered with.
    #[instrument(skip(self, ctx))]
    pub async fn store_url(&self, ctx: &OpContext, url: &str) -> Result<String> {
        if url.is_empty() {
            return Err(ShortdigestError::invalid_input("url must not be empty"));
        }

        if self.might_contain(ctx, FilterSet::Url, url).await
            && let Some(existing) = self.store.find_by_url(ctx, url).await?
        {
            debug!("URL already registered as {}", existing.digest);
            return Err(ShortdigestError::already_exists(url, existing.digest));
        }

        let mut digest = self.encoder.encode(url);
        let mut salted = 0u32;

        loop {
            if self.might_contain(ctx, FilterSet::Digest, &digest).await
                && let Some(holder) = self.store.find_by_digest(ctx, &digest).await?
            {
                if holder.url == url {
                    // 并发注册同一个 URL，对方先完成
                    return Err(ShortdigestError::already_exists(url, holder.digest));
                }
                warn!("Digest {} already belongs to {}", digest, holder.url);
                digest = self.next_salted(url, &digest, &mut salted)?;
                continue;
            }

            let record = UrlRecord::new(url, &digest, salted > 0);
            match self.store.insert(ctx, &record).await? {
                InsertOutcome::Inserted => break,
                InsertOutcome::UniqueViolation => {
                    if let Some(existing) = self.store.find_by_url(ctx, url).await? {
                        debug!("Lost registration race, winner digest {}", existing.digest);
                        return Err(ShortdigestError::already_exists(url, existing.digest));
                    }
                    warn!("Insert of digest {} hit the digest uniqueness constraint", digest);
                    digest = self.next_salted(url, &digest, &mut salted)?;
                }
            }
        }

        self.publish(ctx, url, &digest).await;
        info!("Registered {} as {}{}", url, digest, if salted > 0 { " (salted)" } else { "" });
        Ok(digest)
    }

    /// Resolve a digest back to the URL it was registered for.
    #[instrument(skip(self, ctx))]
    pub async fn resolve(&self, ctx: &OpContext, digest: &str) -> Result<String> {
        if digest.is_empty() {
            return Err(ShortdigestError::invalid_input("digest must not be empty"));
        }

        match self.cache.get(ctx, digest).await {
            Ok(Some(url)) => {
                debug!("Cache hit");
                return Ok(url);
            }
            Ok(None) => debug!("Cache miss"),
            Err(e) => warn!("Cache lookup failed, falling back to {}: {}", self.store.backend_name(), e),
        }

        let record = self
            .store
            .find_by_digest(ctx, digest)
            .await?
            .ok_or_else(|| ShortdigestError::not_found(digest))?;

        if self.populate_on_miss
            && let Err(e) = self
                .cache
                .set_with_ttl(ctx, digest, &record.url, self.cache_ttl)
                .await
        {
            warn!("Failed to populate cache for {}: {}", digest, e);
        }

        Ok(record.url)
    }

    /// Alias of [`resolve`](Self::resolve).
    pub async fn get_original_url(&self, ctx: &OpContext, digest: &str) -> Result<String> {
        self.resolve(ctx, digest).await
    }

    /// 过滤器故障时按“可能存在”处理，交给数据库确认
    async fn might_contain(&self, ctx: &OpContext, set: FilterSet, item: &str) -> bool {
        match self.filter.might_contain(ctx, set, item).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(
                    "{} filter check on {} failed, confirming with {}: {}",
                    self.filter.name(),
                    set.key_name(),
                    self.store.backend_name(),
                    e
                );
                true
            }
        }
    }

    fn next_salted(&self, url: &str, digest: &str, salted: &mut u32) -> Result<String> {
        if *salted >= self.collision.max_salted_retries {
            return Err(ShortdigestError::collision_exhausted(url, digest));
        }
        *salted += 1;
        let next = self.encoder.encode(&CollisionPolicy::salt(url));
        debug!("Regenerated digest {} -> {} (salt #{})", digest, next, salted);
        Ok(next)
    }

    /// The record is durable at this point; failures here are logged only.
    async fn publish(&self, ctx: &OpContext, url: &str, digest: &str) {
        for (set, item) in [(FilterSet::Url, url), (FilterSet::Digest, digest)] {
            if let Err(e) = self.filter.add(ctx, set, item).await {
                warn!("Failed to add {} to {}: {}", item, set.key_name(), e);
            }
        }
        if let Err(e) = self
            .cache
            .set_with_ttl(ctx, digest, url, self.cache_ttl)
            .await
        {
            warn!("Failed to cache {}: {}", digest, e);
        }
    }
}
