//! SeaORM storage backend
//!
//! Durable store on SQLite or PostgreSQL.

mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::context::OpContext;
use crate::errors::{Backend, Result, ShortdigestError};
use crate::storage::{DurableStore, InsertOutcome, UrlRecord};
use crate::utils::retry::RetryPolicy;

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{model_to_record, record_to_active_model};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<&'static str> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite")
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(ShortdigestError::config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based durable store
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
    backend_name: &'static str,
    retry_policy: RetryPolicy,
}

impl SeaOrmStore {
    /// Open a connection pool. Does not touch the schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let database_url = config.database_url.trim();
        if database_url.is_empty() {
            return Err(ShortdigestError::config("DATABASE_URL 未设置"));
        }

        let backend_name = infer_backend_from_url(database_url)?;
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url, config).await?
        } else {
            connect_generic(database_url, config).await?
        };

        info!("{} store connected", backend_name.to_uppercase());
        Ok(Self {
            db,
            backend_name,
            retry_policy: config.retry_policy(),
        })
    }

    /// Create table and indexes if missing.
    pub async fn migrate(&self) -> Result<()> {
        run_migrations(&self.db).await
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl DurableStore for SeaOrmStore {
    async fn find_by_url(&self, ctx: &OpContext, url: &str) -> Result<Option<UrlRecord>> {
        ctx.run(Backend::Database, self.get_by_url(url)).await
    }

    async fn find_by_digest(&self, ctx: &OpContext, digest: &str) -> Result<Option<UrlRecord>> {
        ctx.run(Backend::Database, self.get_by_digest(digest)).await
    }

    async fn insert(&self, ctx: &OpContext, record: &UrlRecord) -> Result<InsertOutcome> {
        ctx.run(Backend::Database, self.insert_record(record)).await
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| ShortdigestError::backend(Backend::Database, e))
    }

    fn backend_name(&self) -> &str {
        self.backend_name
    }
}
