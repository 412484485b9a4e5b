use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tracing::debug;

use crate::config::RedisConfig;
use crate::errors::{Backend, Result, ShortdigestError};

/// Shared Redis handle for the cache and the existence filter.
///
/// `ConnectionManager` reconnects on its own and is cheap to clone.
#[derive(Clone)]
pub struct RedisConnection {
    manager: ConnectionManager,
    key_prefix: String,
}

impl RedisConnection {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| ShortdigestError::config(format!("Invalid Redis URL: {}", e)))?;

        // 启动重试由外层探活负责，这里只做一次快速重连
        let manager_config = ConnectionManagerConfig::new().set_number_of_retries(1);
        let manager = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(|e| ShortdigestError::backend(Backend::Cache, e))?;

        debug!("Redis connection established, prefix: '{}'", config.key_prefix);
        Ok(Self {
            manager,
            key_prefix: config.key_prefix.clone(),
        })
    }

    pub fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }

    pub fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    pub async fn ping(&self, backend: Backend) -> Result<()> {
        let mut conn = self.conn();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| ShortdigestError::backend(backend, e))?;
        debug!("Redis PING -> {}", reply);
        Ok(())
    }
}
