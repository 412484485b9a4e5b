use std::time::Duration;

use async_trait::async_trait;

use crate::context::OpContext;
use crate::errors::Result;

/// Bloom filter reservation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomConfig {
    pub capacity: u64,
    pub fp_rate: f64,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000_000,
            fp_rate: 0.001,
        }
    }
}

/// The two independent membership sets kept by an [`ExistenceFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterSet {
    Url,
    Digest,
}

impl FilterSet {
    pub const ALL: [FilterSet; 2] = [FilterSet::Url, FilterSet::Digest];

    /// Key name under the shared prefix.
    pub fn key_name(&self) -> &'static str {
        match self {
            FilterSet::Url => "url_filter",
            FilterSet::Digest => "digest_filter",
        }
    }
}

/// Probabilistic membership over seen URLs and seen digests.
///
/// - `false` 表示**一定不存在**
/// - `true` 表示**可能存在**，必须回源数据库确认
#[async_trait]
pub trait ExistenceFilter: Send + Sync {
    /// Reserve every set that does not exist yet. Existing sets are left alone.
    async fn provision(&self, config: &BloomConfig) -> Result<()>;

    async fn add(&self, ctx: &OpContext, set: FilterSet, item: &str) -> Result<()>;

    async fn might_contain(&self, ctx: &OpContext, set: FilterSet, item: &str) -> Result<bool>;

    fn name(&self) -> &'static str;
}

/// Ephemeral digest → URL lookups with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, ctx: &OpContext, digest: &str) -> Result<Option<String>>;

    async fn set_with_ttl(
        &self,
        ctx: &OpContext,
        digest: &str,
        url: &str,
        ttl: Duration,
    ) -> Result<()>;

    /// Reachability probe used at startup.
    async fn ping(&self) -> Result<()>;

    fn name(&self) -> &'static str;
}
