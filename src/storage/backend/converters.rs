use crate::storage::UrlRecord;
use migration::entities::shortener;

/// 将 Sea-ORM Model 转换为 UrlRecord
pub fn model_to_record(model: shortener::Model) -> UrlRecord {
    UrlRecord {
        url: model.url,
        digest: model.digest,
        created_at: model.date,
        collided: model.collide.unwrap_or(false),
    }
}

/// 将 UrlRecord 转换为 ActiveModel（仅用于插入，记录不会被更新）
pub fn record_to_active_model(record: &UrlRecord) -> shortener::ActiveModel {
    use sea_orm::ActiveValue::Set;

    shortener::ActiveModel {
        url: Set(record.url.clone()),
        digest: Set(record.digest.clone()),
        date: Set(record.created_at),
        collide: Set(Some(record.collided)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::ActiveValue;

    #[test]
    fn test_model_to_record_null_collide_is_false() {
        let model = shortener::Model {
            url: "example.com/page".to_string(),
            digest: "D1".to_string(),
            date: Utc::now(),
            collide: None,
        };

        let record = model_to_record(model);
        assert_eq!(record.url, "example.com/page");
        assert_eq!(record.digest, "D1");
        assert!(!record.collided);
    }

    #[test]
    fn test_record_to_active_model_sets_all_columns() {
        let record = UrlRecord::new("example.com/page", "D1", true);
        let active = record_to_active_model(&record);

        assert_eq!(active.url, ActiveValue::Set("example.com/page".to_string()));
        assert_eq!(active.digest, ActiveValue::Set("D1".to_string()));
        assert_eq!(active.date, ActiveValue::Set(record.created_at));
        assert_eq!(active.collide, ActiveValue::Set(Some(true)));
    }
}
