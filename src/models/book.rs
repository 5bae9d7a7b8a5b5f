use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Persisted metadata for one uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Canonical storage key, unique across all books
    pub file_name: String,
    /// Backend reference: a fetchable URL for remote storage, `/local-files/<file_name>` for local
    pub download_url: String,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; id, counter and timestamp are assigned by the store
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub file_name: String,
    pub download_url: String,
}

/// Title/author/description triple recovered from a document's own metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExtractedMetadata {
    pub title: String,
    pub author: String,
    pub description: String,
}
