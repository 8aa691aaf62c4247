use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use crate::export::ArtifactRef;
use crate::models::share::{AccessLogRow, ShareLinkRow};
use crate::share::models::{AccessAttempt, AccessDecision, AccessLogEntry, DenialReason, RequesterInfo, ShareLink};
use crate::share::password::PasswordHash;
use crate::share::policy::evaluate;
use crate::share::ShareError;

/// Persistence for share links. `record_access` must run the policy and
/// write its effects as one atomic step per link.
#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn insert(&self, link: &ShareLink) -> Result<(), ShareError>;
    async fn get(&self, id: &str) -> Result<Option<ShareLink>, ShareError>;
    /// `None` when no link has this id.
    async fn record_access(
        &self,
        id: &str,
        attempt: &AccessAttempt,
    ) -> Result<Option<AccessDecision>, ShareError>;
    /// Returns false when no link has this id.
    async fn revoke(&self, id: &str) -> Result<bool, ShareError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryShareStore {
    links: Mutex<HashMap<String, ShareLink>>,
}

impl MemoryShareStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ShareLink>>, ShareError> {
        self.links
            .lock()
            .map_err(|_| ShareError::Store("share store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ShareStore for MemoryShareStore {
    async fn insert(&self, link: &ShareLink) -> Result<(), ShareError> {
        self.lock()?.insert(link.id.clone(), link.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ShareLink>, ShareError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn record_access(
        &self,
        id: &str,
        attempt: &AccessAttempt,
    ) -> Result<Option<AccessDecision>, ShareError> {
        let mut links = self.lock()?;
        Ok(links.get_mut(id).map(|link| evaluate(link, attempt)))
    }

    async fn revoke(&self, id: &str) -> Result<bool, ShareError> {
        let mut links = self.lock()?;
        match links.get_mut(id) {
            Some(link) => {
                link.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgShareStore {
    pool: PgPool,
}

impl PgShareStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareStore for PgShareStore {
    async fn insert(&self, link: &ShareLink) -> Result<(), ShareError> {
        sqlx::query(
            r#"
            INSERT INTO share_links
                (id, artifact_key, artifact_content_type, artifact_size_bytes, is_public,
                 password_hash, expires_at, max_access_count, allow_download,
                 access_count, is_active, created_at, owner_token_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&link.id)
        .bind(&link.artifact.key)
        .bind(&link.artifact.content_type)
        .bind(link.artifact.size_bytes as i64)
        .bind(link.is_public)
        .bind(link.password_hash.as_ref().map(|h| h.as_str().to_string()))
        .bind(link.expires_at)
        .bind(link.max_access_count.map(i64::from))
        .bind(link.allow_download)
        .bind(i64::from(link.access_count))
        .bind(link.is_active)
        .bind(link.created_at)
        .bind(&link.owner_token_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ShareLink>, ShareError> {
        let Some(row) =
            sqlx::query_as::<_, ShareLinkRow>("SELECT * FROM share_links WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let log = sqlx::query_as::<_, AccessLogRow>(
            "SELECT * FROM share_access_log WHERE share_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(link_from_row(
            row,
            log.into_iter().map(entry_from_row).collect(),
        )))
    }

    async fn record_access(
        &self,
        id: &str,
        attempt: &AccessAttempt,
    ) -> Result<Option<AccessDecision>, ShareError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent attempts on the same link.
        let Some(row) = sqlx::query_as::<_, ShareLinkRow>(
            "SELECT * FROM share_links WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let mut link = link_from_row(row, Vec::new());
        let decision = evaluate(&mut link, attempt);

        sqlx::query("UPDATE share_links SET access_count = $2, is_active = $3 WHERE id = $1")
            .bind(id)
            .bind(i64::from(link.access_count))
            .bind(link.is_active)
            .execute(&mut *tx)
            .await?;

        for entry in &link.access_log {
            sqlx::query(
                r#"
                INSERT INTO share_access_log (share_id, at, granted, reason, network, agent)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id)
            .bind(entry.at)
            .bind(entry.granted)
            .bind(entry.reason.map(|r| r.as_str()))
            .bind(&entry.requester.network)
            .bind(&entry.requester.agent)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(decision))
    }

    async fn revoke(&self, id: &str) -> Result<bool, ShareError> {
        let result = sqlx::query("UPDATE share_links SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn link_from_row(row: ShareLinkRow, access_log: Vec<AccessLogEntry>) -> ShareLink {
    let password_hash = row.password_hash.and_then(|encoded| {
        let parsed = PasswordHash::from_encoded(encoded);
        if parsed.is_none() {
            warn!("Share link {} has an unreadable password hash", row.id);
        }
        parsed
    });
    // A protected link whose hash cannot be read stays closed.
    let is_active = row.is_active && (row.is_public || password_hash.is_some());

    ShareLink {
        artifact: ArtifactRef {
            key: row.artifact_key,
            content_type: row.artifact_content_type,
            size_bytes: u64::try_from(row.artifact_size_bytes).unwrap_or(0),
        },
        is_public: row.is_public,
        password_hash,
        expires_at: row.expires_at,
        max_access_count: row.max_access_count.map(clamp_count),
        allow_download: row.allow_download,
        access_count: clamp_count(row.access_count),
        access_log,
        is_active,
        created_at: row.created_at,
        owner_token_hash: row.owner_token_hash,
        id: row.id,
    }
}

fn entry_from_row(row: AccessLogRow) -> AccessLogEntry {
    AccessLogEntry {
        at: row.at,
        granted: row.granted,
        reason: row.reason.as_deref().and_then(DenialReason::parse),
        requester: RequesterInfo {
            network: row.network,
            agent: row.agent,
        },
    }
}

fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn link(id: &str) -> ShareLink {
        ShareLink {
            id: id.to_string(),
            artifact: ArtifactRef {
                key: "exports/d/j.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                size_bytes: 1,
            },
            is_public: true,
            password_hash: None,
            expires_at: None,
            max_access_count: Some(1),
            allow_download: true,
            access_count: 0,
            access_log: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
            owner_token_hash: None,
        }
    }

    fn attempt() -> AccessAttempt {
        AccessAttempt {
            now: Utc::now(),
            password_ok: true,
            requester: RequesterInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_records_access() {
        let store = MemoryShareStore::default();
        store.insert(&link("a")).await.unwrap();

        let first = store.record_access("a", &attempt()).await.unwrap().unwrap();
        assert!(first.is_granted());
        let second = store.record_access("a", &attempt()).await.unwrap().unwrap();
        assert_eq!(second, AccessDecision::Denied(DenialReason::Inactive));

        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(stored.access_count, 1);
        assert_eq!(stored.access_log.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_unknown_link() {
        let store = MemoryShareStore::default();
        assert!(store.record_access("nope", &attempt()).await.unwrap().is_none());
        assert!(!store.revoke("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_revoke() {
        let store = MemoryShareStore::default();
        store.insert(&link("a")).await.unwrap();
        assert!(store.revoke("a").await.unwrap());
        assert!(!store.get("a").await.unwrap().unwrap().is_active);
    }

    #[test]
    fn test_link_from_row_closes_protected_link_with_bad_hash() {
        let row = ShareLinkRow {
            id: "a".to_string(),
            artifact_key: "k".to_string(),
            artifact_content_type: "application/pdf".to_string(),
            artifact_size_bytes: 5,
            is_public: false,
            password_hash: Some("garbage".to_string()),
            expires_at: None,
            max_access_count: Some(3),
            allow_download: false,
            access_count: 2,
            is_active: true,
            created_at: Utc::now(),
            owner_token_hash: None,
        };
        let link = link_from_row(row, Vec::new());
        assert!(!link.is_active);
        assert_eq!(link.max_access_count, Some(3));
        assert_eq!(link.access_count, 2);
    }

    #[test]
    fn test_entry_from_row() {
        let entry = entry_from_row(AccessLogRow {
            id: 1,
            share_id: "a".to_string(),
            at: Utc::now(),
            granted: false,
            reason: Some("expired".to_string()),
            network: Some("10.0.0.0/24".to_string()),
            agent: None,
        });
        assert_eq!(entry.reason, Some(DenialReason::Expired));
        assert_eq!(entry.requester.network.as_deref(), Some("10.0.0.0/24"));
    }
}
