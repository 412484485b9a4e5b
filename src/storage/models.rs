use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered URL and the digest it resolves from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
    pub digest: String,
    pub created_at: DateTime<Utc>,
    /// Digest came from the salted regeneration path
    #[serde(default)]
    pub collided: bool,
}

impl UrlRecord {
    pub fn new(url: impl Into<String>, digest: impl Into<String>, collided: bool) -> Self {
        Self {
            url: url.into(),
            digest: digest.into(),
            created_at: Utc::now(),
            collided,
        }
    }
}

/// Result of an insert that reached the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The row violated the uniqueness of `url` or `digest`.
    UniqueViolation,
}
