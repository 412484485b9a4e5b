//! Durable URL ↔ digest records
//!
//! The relational table is the source of truth. Its uniqueness constraints on
//! `url` and `digest` decide every race the engine cannot see.

use async_trait::async_trait;

use crate::context::OpContext;
use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::SeaOrmStore;
pub use models::{InsertOutcome, UrlRecord};

#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn find_by_url(&self, ctx: &OpContext, url: &str) -> Result<Option<UrlRecord>>;

    async fn find_by_digest(&self, ctx: &OpContext, digest: &str) -> Result<Option<UrlRecord>>;

    /// Insert a new record.
    ///
    /// A uniqueness violation is `Ok(InsertOutcome::UniqueViolation)`; every
    /// other failure is an error.
    async fn insert(&self, ctx: &OpContext, record: &UrlRecord) -> Result<InsertOutcome>;

    /// Reachability probe used at startup.
    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &str;
}
