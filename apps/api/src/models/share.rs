use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShareLinkRow {
    pub id: String,
    pub artifact_key: String,
    pub artifact_content_type: String,
    pub artifact_size_bytes: i64,
    pub is_public: bool,
    pub password_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_access_count: Option<i64>,
    pub allow_download: bool,
    pub access_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub owner_token_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessLogRow {
    pub id: i64,
    pub share_id: String,
    pub at: DateTime<Utc>,
    pub granted: bool,
    pub reason: Option<String>,
    pub network: Option<String>,
    pub agent: Option<String>,
}
