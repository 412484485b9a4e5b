mod moka;
mod redis;

pub use self::moka::MokaCacheStore;
pub use self::redis::RedisCacheStore;
