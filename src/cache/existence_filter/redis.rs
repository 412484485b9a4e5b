use async_trait::async_trait;
use tracing::{debug, trace};

use crate::cache::{BloomConfig, ExistenceFilter, FilterSet, RedisConnection};
use crate::context::OpContext;
use crate::errors::{Backend, Result, ShortdigestError};

/// RedisBloom backed filter, shared by every process pointing at the same Redis.
///
/// Keys: `{prefix}url_filter`, `{prefix}digest_filter`.
pub struct RedisExistenceFilter {
    redis: RedisConnection,
}

impl RedisExistenceFilter {
    pub fn new(redis: RedisConnection) -> Self {
        Self { redis }
    }

    fn key(&self, set: FilterSet) -> String {
        self.redis.make_key(set.key_name())
    }

    async fn reserve(&self, key: &str, config: &BloomConfig) -> Result<()> {
        let mut conn = self.redis.conn();

        let exists: i64 = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| ShortdigestError::backend(Backend::Filter, e))?;
        if exists > 0 {
            debug!("Bloom filter '{}' already exists, skipping reserve", key);
            return Ok(());
        }

        let reserved: redis::RedisResult<()> = redis::cmd("BF.RESERVE")
            .arg(key)
            .arg(config.fp_rate)
            .arg(config.capacity)
            .query_async(&mut conn)
            .await;

        match reserved {
            Ok(()) => {
                debug!(
                    "Bloom filter '{}' reserved: capacity {}, fp_rate {}",
                    key, config.capacity, config.fp_rate
                );
                Ok(())
            }
            // 另一个进程抢先创建
            Err(e) if is_item_exists(&e) => {
                debug!("Bloom filter '{}' created concurrently", key);
                Ok(())
            }
            Err(e) => Err(ShortdigestError::backend(Backend::Filter, e)),
        }
    }
}

fn is_item_exists(err: &redis::RedisError) -> bool {
    err.to_string().to_lowercase().contains("item exists")
}

#[async_trait]
impl ExistenceFilter for RedisExistenceFilter {
    async fn provision(&self, config: &BloomConfig) -> Result<()> {
        for set in FilterSet::ALL {
            self.reserve(&self.key(set), config).await?;
        }
        Ok(())
    }

    async fn add(&self, ctx: &OpContext, set: FilterSet, item: &str) -> Result<()> {
        let key = self.key(set);
        let mut conn = self.redis.conn();
        ctx.run(Backend::Filter, async {
            let _added: i64 = redis::cmd("BF.ADD")
                .arg(&key)
                .arg(item)
                .query_async(&mut conn)
                .await
                .map_err(|e| ShortdigestError::backend(Backend::Filter, e))?;
            trace!("BF.ADD {} {}", key, item);
            Ok(())
        })
        .await
    }

    async fn might_contain(&self, ctx: &OpContext, set: FilterSet, item: &str) -> Result<bool> {
        let key = self.key(set);
        let mut conn = self.redis.conn();
        ctx.run(Backend::Filter, async {
            let found: i64 = redis::cmd("BF.EXISTS")
                .arg(&key)
                .arg(item)
                .query_async(&mut conn)
                .await
                .map_err(|e| ShortdigestError::backend(Backend::Filter, e))?;
            Ok(found == 1)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "redisbloom"
    }
}
