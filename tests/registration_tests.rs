//! RegistrationEngine tests
//!
//! In-process cache and bloom filter in front of a temporary SQLite store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shortdigest::cache::{
    BloomConfig, BloomExistenceFilter, CacheStore, ExistenceFilter, FilterSet, MokaCacheStore,
};
use shortdigest::config::DatabaseConfig;
use shortdigest::context::OpContext;
use shortdigest::digest::{DigestEncoder, Xxh64Encoder};
use shortdigest::errors::{Backend, Result, ShortdigestError};
use shortdigest::services::RegistrationEngine;
use shortdigest::storage::{DurableStore, SeaOrmStore, UrlRecord};
use tempfile::TempDir;

struct Harness {
    store: Arc<SeaOrmStore>,
    cache: Arc<MokaCacheStore>,
    filter: Arc<BloomExistenceFilter>,
    _dir: TempDir,
}

fn small_bloom() -> BloomConfig {
    BloomConfig {
        capacity: 10_000,
        fp_rate: 0.001,
    }
}

async fn harness() -> Harness {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display()),
        ..Default::default()
    };
    let store = SeaOrmStore::connect(&config).await.expect("connect");
    store.migrate().await.expect("migrate");

    let filter = BloomExistenceFilter::new(small_bloom());
    filter.provision(&small_bloom()).await.unwrap();

    Harness {
        store: Arc::new(store),
        cache: Arc::new(MokaCacheStore::new(1000)),
        filter: Arc::new(filter),
        _dir: dir,
    }
}

impl Harness {
    fn engine(&self) -> RegistrationEngine {
        RegistrationEngine::new(self.store.clone(), self.cache.clone(), self.filter.clone())
            .with_cache_ttl(Duration::from_secs(60))
    }

    /// Same store and cache, but an empty filter of its own, like a second
    /// process whose in-memory filter has not seen earlier registrations.
    fn engine_with_fresh_filter(&self) -> RegistrationEngine {
        RegistrationEngine::new(
            self.store.clone(),
            self.cache.clone(),
            Arc::new(BloomExistenceFilter::new(small_bloom())),
        )
    }
}

/// "a.example" and "b.example" share a digest; any salted input gets another one.
fn colliding_encoder() -> Arc<dyn DigestEncoder> {
    Arc::new(|input: &str| match input {
        "a.example" | "b.example" => "D1".to_string(),
        _ => "D2".to_string(),
    })
}

fn constant_encoder() -> Arc<dyn DigestEncoder> {
    Arc::new(|_: &str| "D1".to_string())
}

#[tokio::test]
async fn test_store_resolve_and_restore() {
    let h = harness().await;
    let engine = h.engine();
    let ctx = OpContext::background();
    let url = "example.com/page";

    let d1 = engine.store_url(&ctx, url).await.unwrap();
    assert_eq!(d1, Xxh64Encoder.encode(url));

    assert_eq!(engine.get_original_url(&ctx, &d1).await.unwrap(), url);

    match engine.store_url(&ctx, url).await.unwrap_err() {
        ShortdigestError::AlreadyExists { url: u, digest } => {
            assert_eq!(u, url);
            assert_eq!(digest, d1);
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[tokio::test]
async fn test_store_publishes_to_filter_and_cache() {
    let h = harness().await;
    let engine = h.engine();
    let ctx = OpContext::background();

    let digest = engine.store_url(&ctx, "example.com/x").await.unwrap();

    assert!(h
        .filter
        .might_contain(&ctx, FilterSet::Url, "example.com/x")
        .await
        .unwrap());
    assert!(h
        .filter
        .might_contain(&ctx, FilterSet::Digest, &digest)
        .await
        .unwrap());
    assert_eq!(
        h.cache.get(&ctx, &digest).await.unwrap().as_deref(),
        Some("example.com/x")
    );
}

#[tokio::test]
async fn test_unknown_digest_is_not_found() {
    let h = harness().await;
    let engine = h.engine();
    let ctx = OpContext::background();

    let err = engine.resolve(&ctx, "doesNotExist").await.unwrap_err();
    assert!(matches!(err, ShortdigestError::NotFound { ref digest } if digest == "doesNotExist"));
}

#[tokio::test]
async fn test_empty_input_rejected() {
    let h = harness().await;
    let engine = h.engine();
    let ctx = OpContext::background();

    assert!(matches!(
        engine.store_url(&ctx, "").await,
        Err(ShortdigestError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.resolve(&ctx, "").await,
        Err(ShortdigestError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_collision_gets_salted_digest() {
    let h = harness().await;
    let engine = h.engine().with_encoder(colliding_encoder());
    let ctx = OpContext::background();

    assert_eq!(engine.store_url(&ctx, "a.example").await.unwrap(), "D1");
    let second = engine.store_url(&ctx, "b.example").await.unwrap();
    assert_eq!(second, "D2");

    let record = h.store.find_by_url(&ctx, "b.example").await.unwrap().unwrap();
    assert!(record.collided);
    let first = h.store.find_by_url(&ctx, "a.example").await.unwrap().unwrap();
    assert!(!first.collided);

    assert_eq!(engine.resolve(&ctx, "D1").await.unwrap(), "a.example");
    assert_eq!(engine.resolve(&ctx, "D2").await.unwrap(), "b.example");
}

#[tokio::test]
async fn test_salted_coincidence_is_exhausted() {
    let h = harness().await;
    let engine = h.engine().with_encoder(constant_encoder());
    let ctx = OpContext::background();

    engine.store_url(&ctx, "a.example").await.unwrap();
    let err = engine.store_url(&ctx, "b.example").await.unwrap_err();
    assert!(matches!(
        err,
        ShortdigestError::CollisionExhausted { ref url, ref digest }
            if url == "b.example" && digest == "D1"
    ));
    assert!(h.store.find_by_url(&ctx, "b.example").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unique_violation_classified_by_follow_up_read() {
    let h = harness().await;
    let ctx = OpContext::background();
    h.engine()
        .with_encoder(colliding_encoder())
        .store_url(&ctx, "a.example")
        .await
        .unwrap();

    // 过滤器没见过这些记录，冲突只能由唯一约束发现
    let other = h.engine_with_fresh_filter().with_encoder(colliding_encoder());

    let err = other.store_url(&ctx, "a.example").await.unwrap_err();
    assert_eq!(err.digest(), Some("D1"));
    assert!(matches!(err, ShortdigestError::AlreadyExists { .. }));

    assert_eq!(other.store_url(&ctx, "b.example").await.unwrap(), "D2");
}

#[tokio::test]
async fn test_unique_violation_exhausts_salt_budget() {
    let h = harness().await;
    let ctx = OpContext::background();
    h.engine()
        .with_encoder(constant_encoder())
        .store_url(&ctx, "a.example")
        .await
        .unwrap();

    let other = h.engine_with_fresh_filter().with_encoder(constant_encoder());
    assert!(matches!(
        other.store_url(&ctx, "b.example").await,
        Err(ShortdigestError::CollisionExhausted { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_registrations() {
    let h = harness().await;
    let engine = Arc::new(h.engine());
    let url = "example.com/race";

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.store_url(&OpContext::background(), url).await
        }));
    }

    let mut created = Vec::new();
    let mut existing = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(digest) => created.push(digest),
            Err(ShortdigestError::AlreadyExists { digest, .. }) => existing.push(digest),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created.len(), 1, "exactly one registration should win");
    assert!(existing.iter().all(|d| *d == created[0]));
}

#[tokio::test]
async fn test_cache_hit_skips_store() {
    let h = harness().await;
    let engine = h.engine();
    let ctx = OpContext::background();

    // 只存在于缓存中
    h.cache
        .set_with_ttl(&ctx, "CACHED", "cached.example", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(engine.resolve(&ctx, "CACHED").await.unwrap(), "cached.example");
}

#[tokio::test]
async fn test_cache_miss_does_not_populate_by_default() {
    let h = harness().await;
    let engine = h.engine();
    let ctx = OpContext::background();

    h.store
        .insert(&ctx, &UrlRecord::new("direct.example", "DIRECT", false))
        .await
        .unwrap();

    assert_eq!(engine.resolve(&ctx, "DIRECT").await.unwrap(), "direct.example");
    assert_eq!(h.cache.get(&ctx, "DIRECT").await.unwrap(), None);
}

#[tokio::test]
async fn test_populate_on_miss() {
    let h = harness().await;
    let engine = h.engine().with_populate_on_miss(true);
    let ctx = OpContext::background();

    h.store
        .insert(&ctx, &UrlRecord::new("direct.example", "DIRECT", false))
        .await
        .unwrap();

    assert_eq!(engine.resolve(&ctx, "DIRECT").await.unwrap(), "direct.example");
    assert_eq!(
        h.cache.get(&ctx, "DIRECT").await.unwrap().as_deref(),
        Some("direct.example")
    );
}

#[tokio::test]
async fn test_cancelled_context_is_backend_unavailable() {
    let h = harness().await;
    let engine = h.engine();
    let ctx = OpContext::background();
    ctx.cancel();

    let err = engine.store_url(&ctx, "example.com").await.unwrap_err();
    assert!(matches!(
        err,
        ShortdigestError::BackendUnavailable {
            backend: Backend::Database,
            ..
        }
    ));

    let err = engine.resolve(&ctx, "anything").await.unwrap_err();
    assert!(err.is_backend_failure());
    assert!(!matches!(err, ShortdigestError::NotFound { .. }));
}

#[tokio::test]
async fn test_expired_deadline_is_backend_unavailable() {
    let h = harness().await;
    let engine = h.engine();
    let ctx = OpContext::with_timeout(Duration::ZERO);

    let err = engine.resolve(&ctx, "anything").await.unwrap_err();
    assert!(err.is_backend_failure());
}

/// Every call fails, as if Redis were down.
struct BrokenFilter;

#[async_trait]
impl ExistenceFilter for BrokenFilter {
    async fn provision(&self, _config: &BloomConfig) -> Result<()> {
        Err(ShortdigestError::backend_msg(Backend::Filter, "down"))
    }

    async fn add(&self, _ctx: &OpContext, _set: FilterSet, _item: &str) -> Result<()> {
        Err(ShortdigestError::backend_msg(Backend::Filter, "down"))
    }

    async fn might_contain(&self, _ctx: &OpContext, _set: FilterSet, _item: &str) -> Result<bool> {
        Err(ShortdigestError::backend_msg(Backend::Filter, "down"))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _ctx: &OpContext, _digest: &str) -> Result<Option<String>> {
        Err(ShortdigestError::backend_msg(Backend::Cache, "down"))
    }

    async fn set_with_ttl(
        &self,
        _ctx: &OpContext,
        _digest: &str,
        _url: &str,
        _ttl: Duration,
    ) -> Result<()> {
        Err(ShortdigestError::backend_msg(Backend::Cache, "down"))
    }

    async fn ping(&self) -> Result<()> {
        Err(ShortdigestError::backend_msg(Backend::Cache, "down"))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn test_broken_filter_and_cache_fall_back_to_store() {
    let h = harness().await;
    let engine = RegistrationEngine::new(
        h.store.clone(),
        Arc::new(BrokenCache),
        Arc::new(BrokenFilter),
    );
    let ctx = OpContext::background();

    let digest = engine.store_url(&ctx, "example.com/degraded").await.unwrap();
    assert_eq!(
        engine.resolve(&ctx, &digest).await.unwrap(),
        "example.com/degraded"
    );
    assert!(matches!(
        engine.store_url(&ctx, "example.com/degraded").await,
        Err(ShortdigestError::AlreadyExists { .. })
    ));
}
