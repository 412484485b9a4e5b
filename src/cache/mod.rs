//! Cache layer and existence filter
//!
//! Both live on the same key-value service: Redis (with RedisBloom) in
//! production, or in-process moka + bloom filter on a single node.

pub mod existence_filter;
pub mod object_cache;
pub mod redis_client;
pub mod traits;

pub use existence_filter::{BloomExistenceFilter, RedisExistenceFilter};
pub use object_cache::{MokaCacheStore, RedisCacheStore};
pub use redis_client::RedisConnection;
pub use traits::{BloomConfig, CacheStore, ExistenceFilter, FilterSet};
