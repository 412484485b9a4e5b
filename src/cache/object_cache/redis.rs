use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::cache::{CacheStore, RedisConnection};
use crate::context::OpContext;
use crate::errors::{Backend, Result};

/// Redis digest → URL cache, `SET … EX` under the key prefix.
pub struct RedisCacheStore {
    redis: RedisConnection,
}

impl RedisCacheStore {
    pub fn new(redis: RedisConnection) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, ctx: &OpContext, digest: &str) -> Result<Option<String>> {
        let key = self.redis.make_key(digest);
        let mut conn = self.redis.conn();
        ctx.run(Backend::Cache, async {
            let value: Option<String> = redis::cmd("GET")
                .arg(&key)
                .query_async(&mut conn)
                .await?;
            trace!("GET {} -> hit: {}", key, value.is_some());
            Ok(value)
        })
        .await
    }

    async fn set_with_ttl(
        &self,
        ctx: &OpContext,
        digest: &str,
        url: &str,
        ttl: Duration,
    ) -> Result<()> {
        let key = self.redis.make_key(digest);
        // EX 只接受正整数秒
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.redis.conn();
        ctx.run(Backend::Cache, async {
            let _: () = redis::cmd("SET")
                .arg(&key)
                .arg(url)
                .arg("EX")
                .arg(seconds)
                .query_async(&mut conn)
                .await?;
            trace!("SET {} EX {}", key, seconds);
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.redis.ping(Backend::Cache).await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
