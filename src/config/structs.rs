use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ShortdigestError};
use crate::utils::retry::RetryPolicy;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 优先级：ENV > config.toml > 默认值
/// ENV 前缀：SD，分隔符：__
/// 示例：SD__CACHE__BACKEND=memory
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub startup: StartupConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// Load from an optional TOML file overlaid with `SD__*` environment variables.
    pub fn try_load(path: Option<&str>) -> Result<Self> {
        use config::{Config, Environment, File};

        let (path, required) = match path {
            Some(p) => (p, true),
            None => (DEFAULT_CONFIG_PATH, false),
        };

        let settings = Config::builder()
            .add_source(File::with_name(path).required(required))
            .add_source(
                Environment::with_prefix("SD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: StaticConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.database_url.trim().is_empty() {
            return Err(ShortdigestError::config("database.database_url is empty"));
        }
        if !(self.filter.error_rate > 0.0 && self.filter.error_rate < 1.0) {
            return Err(ShortdigestError::config(format!(
                "filter.error_rate must be in (0, 1), got {}",
                self.filter.error_rate
            )));
        }
        if self.filter.capacity == 0 {
            return Err(ShortdigestError::config("filter.capacity must be positive"));
        }
        if self.cache.default_ttl == 0 {
            return Err(ShortdigestError::config("cache.default_ttl must be positive"));
        }
        if self.startup.attempts == 0 {
            return Err(ShortdigestError::config("startup.attempts must be positive"));
        }
        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("# Error generating sample config: {}", e))
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite://…`, a bare `*.db` path, or `postgres://…`
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    /// Connect / acquire timeout in seconds
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    /// Retries for transient errors (busy, deadlock) on each query
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl DatabaseConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_count.saturating_add(1),
            self.retry_base_delay_ms,
            self.retry_max_delay_ms,
        )
    }
}

/// Which service backs the cache and the existence filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Redis with the RedisBloom module
    #[default]
    Redis,
    /// In-process moka cache + bloom filter (single node, not shared)
    Memory,
}

/// 缓存系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,
    /// Entry TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub default_ttl: u64,
    /// Write database hits back into the cache on a cache miss
    #[serde(default)]
    pub populate_on_miss: bool,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prepended to every cache and filter key
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

/// 内存缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_capacity")]
    pub max_capacity: u64,
}

/// Existence filter provisioning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_filter_error_rate")]
    pub error_rate: f64,
    #[serde(default = "default_filter_capacity")]
    pub capacity: u64,
}

/// Startup reachability probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConfig {
    #[serde(default = "default_startup_attempts")]
    pub attempts: u32,
    #[serde(default = "default_startup_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_startup_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl StartupConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, self.base_delay_ms, self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Salted regenerations allowed per registration
    #[serde(default = "default_max_salted_retries")]
    pub max_salted_retries: u32,
    /// Deadline applied by the binary to each engine call, 0 = none
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_database_url() -> String {
    "sqlite://data.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    8
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_cache_ttl() -> u64 {
    2 * 60 * 60
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_redis_key_prefix() -> String {
    "urlshortener:".to_string()
}

fn default_memory_capacity() -> u64 {
    10000
}

fn default_filter_error_rate() -> f64 {
    0.001
}

fn default_filter_capacity() -> u64 {
    1_000_000
}

fn default_startup_attempts() -> u32 {
    8
}

fn default_startup_base_delay_ms() -> u64 {
    100
}

fn default_startup_max_delay_ms() -> u64 {
    10_000
}

fn default_max_salted_retries() -> u32 {
    1
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            default_ttl: default_cache_ttl(),
            populate_on_miss: false,
            redis: RedisConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_memory_capacity(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            error_rate: default_filter_error_rate(),
            capacity: default_filter_capacity(),
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            attempts: default_startup_attempts(),
            base_delay_ms: default_startup_base_delay_ms(),
            max_delay_ms: default_startup_max_delay_ms(),
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_salted_retries: default_max_salted_retries(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StaticConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.ttl(), Duration::from_secs(7200));
        assert_eq!(config.cache.redis.key_prefix, "urlshortener:");
        assert_eq!(config.registration.max_salted_retries, 1);
        assert!(!config.cache.populate_on_miss);
    }

    #[test]
    fn test_invalid_error_rate_rejected() {
        let mut config = StaticConfig::default();
        config.filter.error_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ShortdigestError::Config(_))
        ));
    }

    #[test]
    fn test_database_retry_policy_counts_first_try() {
        let config = DatabaseConfig::default();
        assert_eq!(config.retry_policy().attempts, 4);
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.cache.backend, CacheBackendKind::Redis);
        assert_eq!(parsed.startup.attempts, 8);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [cache]
            backend = "memory"
            default_ttl = 60
            "#,
        )
        .unwrap();
        assert_eq!(parsed.cache.backend, CacheBackendKind::Memory);
        assert_eq!(parsed.cache.default_ttl, 60);
        assert_eq!(parsed.filter.capacity, 1_000_000);
    }
}
