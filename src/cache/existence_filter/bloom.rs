use std::collections::HashMap;

use async_trait::async_trait;
use bloomfilter::Bloom;
use parking_lot::RwLock;
use tracing::debug;

use crate::cache::{BloomConfig, ExistenceFilter, FilterSet};
use crate::context::OpContext;
use crate::errors::{Backend, Result, ShortdigestError};

/// 进程内布隆过滤器（单节点部署，不跨进程共享）
pub struct BloomExistenceFilter {
    sets: RwLock<HashMap<FilterSet, Bloom<str>>>,
    default_config: BloomConfig,
}

impl Default for BloomExistenceFilter {
    fn default() -> Self {
        Self::new(BloomConfig::default())
    }
}

impl BloomExistenceFilter {
    /// `default_config` is used when `add` hits a set that was never provisioned.
    pub fn new(default_config: BloomConfig) -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            default_config,
        }
    }

    fn build(config: &BloomConfig) -> Result<Bloom<str>> {
        let capacity = usize::try_from(config.capacity).unwrap_or(usize::MAX);
        Bloom::new_for_fp_rate(capacity, config.fp_rate).map_err(|e| {
            ShortdigestError::backend_msg(
                Backend::Filter,
                format!("Failed to create bloom filter: {e}"),
            )
        })
    }
}

#[async_trait]
impl ExistenceFilter for BloomExistenceFilter {
    async fn provision(&self, config: &BloomConfig) -> Result<()> {
        let mut sets = self.sets.write();
        for set in FilterSet::ALL {
            if sets.contains_key(&set) {
                debug!("Bloom filter '{}' already provisioned", set.key_name());
                continue;
            }
            sets.insert(set, Self::build(config)?);
            debug!(
                "Bloom filter '{}' provisioned: capacity {}, fp_rate {}",
                set.key_name(),
                config.capacity,
                config.fp_rate
            );
        }
        Ok(())
    }

    async fn add(&self, _ctx: &OpContext, set: FilterSet, item: &str) -> Result<()> {
        let mut sets = self.sets.write();
        if !sets.contains_key(&set) {
            // 与 BF.ADD 一致：集合不存在时按默认参数创建
            sets.insert(set, Self::build(&self.default_config)?);
        }
        if let Some(bloom) = sets.get_mut(&set) {
            bloom.set(item);
        }
        Ok(())
    }

    async fn might_contain(&self, _ctx: &OpContext, set: FilterSet, item: &str) -> Result<bool> {
        let sets = self.sets.read();
        Ok(sets.get(&set).is_some_and(|bloom| bloom.check(item)))
    }

    fn name(&self) -> &'static str {
        "bloom"
    }
}
