//! Read operations for SeaOrmStore

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::trace;

use super::converters::model_to_record;
use super::{SeaOrmStore, retry};
use crate::errors::Result;
use crate::storage::UrlRecord;

use migration::entities::shortener;

impl SeaOrmStore {
    pub async fn get_by_url(&self, url: &str) -> Result<Option<UrlRecord>> {
        let db = &self.db;

        let model = retry::with_retry("find_by_url", self.retry_policy, || async {
            shortener::Entity::find_by_id(url.to_owned()).one(db).await
        })
        .await?;

        trace!("find_by_url hit={}", model.is_some());
        Ok(model.map(model_to_record))
    }

    pub async fn get_by_digest(&self, digest: &str) -> Result<Option<UrlRecord>> {
        let db = &self.db;

        let model = retry::with_retry("find_by_digest", self.retry_policy, || async {
            shortener::Entity::find()
                .filter(shortener::Column::Digest.eq(digest))
                .one(db)
                .await
        })
        .await?;

        trace!("find_by_digest({}) hit={}", digest, model.is_some());
        Ok(model.map(model_to_record))
    }
}
