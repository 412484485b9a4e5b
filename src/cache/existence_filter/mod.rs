mod bloom;
mod redis;

pub use self::bloom::BloomExistenceFilter;
pub use self::redis::RedisExistenceFilter;
