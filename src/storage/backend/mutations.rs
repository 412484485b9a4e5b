//! Write operations for SeaOrmStore
//!
//! Records are insert-only; there is no update or delete path.

use sea_orm::EntityTrait;
use tracing::{debug, info};

use super::converters::record_to_active_model;
use super::{SeaOrmStore, retry};
use crate::errors::Result;
use crate::storage::{InsertOutcome, UrlRecord};

use migration::entities::shortener;

impl SeaOrmStore {
    pub async fn insert_record(&self, record: &UrlRecord) -> Result<InsertOutcome> {
        let db = &self.db;

        let result = retry::with_retry("insert", self.retry_policy, || async {
            shortener::Entity::insert(record_to_active_model(record))
                .exec_without_returning(db)
                .await
        })
        .await;

        match result {
            Ok(_) => {
                info!(
                    "Record inserted: {} -> {} (collided: {})",
                    record.digest, record.url, record.collided
                );
                Ok(InsertOutcome::Inserted)
            }
            Err(e) if retry::is_unique_violation(&e) => {
                debug!("Insert of '{}' hit a unique constraint: {}", record.url, e);
                Ok(InsertOutcome::UniqueViolation)
            }
            Err(e) => Err(e.into()),
        }
    }
}
