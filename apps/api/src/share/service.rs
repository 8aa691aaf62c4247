//! Share links over stored export artifacts.
//!
//! Requesters only ever learn granted / denied. The specific denial reason goes
//! to the access log and the service log. Viewing, reading the log of and
//! revoking a link require the owner token issued when it was created.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::export::{ArtifactRef, ArtifactStore};
use crate::share::models::{
    AccessAttempt, AccessDecision, AccessLogEntry, CreatedShare, DenialReason, RequesterInfo,
    ShareConfig, ShareLink, ShareLinkView,
};
use crate::share::password::{new_link_id, new_owner_token, PasswordHash};
use crate::share::store::ShareStore;
use crate::share::ShareError;

/// Outcome of `access_share` as the requester sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessGrant {
    pub granted: bool,
    pub artifact: Option<ArtifactRef>,
    pub allow_download: bool,
}

impl AccessGrant {
    fn denied() -> Self {
        Self {
            granted: false,
            artifact: None,
            allow_download: false,
        }
    }
}

pub struct ShareService {
    store: Arc<dyn ShareStore>,
    artifacts: Arc<dyn ArtifactStore>,
    public_base_url: String,
}

impl ShareService {
    pub fn new(
        store: Arc<dyn ShareStore>,
        artifacts: Arc<dyn ArtifactStore>,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            artifacts,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn share_url(&self, id: &str) -> String {
        format!("{}/s/{id}", self.public_base_url)
    }

    pub async fn create_share(
        &self,
        artifact: ArtifactRef,
        config: ShareConfig,
        now: DateTime<Utc>,
    ) -> Result<CreatedShare, ShareError> {
        let password = config.password.filter(|p| !p.is_empty());
        if !config.is_public && password.is_none() {
            return Err(ShareError::Invalid(
                "A private link must carry a password".to_string(),
            ));
        }
        if config.max_access_count == Some(0) {
            return Err(ShareError::Invalid(
                "maxAccessCount must be at least 1".to_string(),
            ));
        }
        if config.expires_at.is_some_and(|at| at <= now) {
            return Err(ShareError::Invalid(
                "expiresAt must be in the future".to_string(),
            ));
        }

        let password_hash = match password {
            Some(password) => Some(
                tokio::task::spawn_blocking(move || PasswordHash::create(&password))
                    .await
                    .map_err(|e| ShareError::Store(format!("password hashing failed: {e}")))?,
            ),
            None => None,
        };

        let (owner_token, owner_token_hash) = new_owner_token();
        let link = ShareLink {
            id: new_link_id(),
            artifact,
            is_public: config.is_public,
            password_hash,
            expires_at: config.expires_at,
            max_access_count: config.max_access_count,
            allow_download: config.allow_download,
            access_count: 0,
            access_log: Vec::new(),
            is_active: true,
            created_at: now,
            owner_token_hash: Some(owner_token_hash),
        };
        self.store.insert(&link).await?;

        info!(
            "Created share link {} for {} (public: {}, protected: {})",
            short(&link.id),
            link.artifact.key,
            link.is_public,
            link.password_hash.is_some()
        );
        Ok(CreatedShare {
            link: link.view(self.share_url(&link.id)),
            owner_token,
        })
    }

    /// Checks the password, then runs the atomic check-and-increment.
    pub async fn access_share(
        &self,
        id: &str,
        password: Option<String>,
        requester: RequesterInfo,
        now: DateTime<Utc>,
    ) -> Result<AccessGrant, ShareError> {
        let Some(link) = self.store.get(id).await? else {
            info!("Share access denied for {}: {}", short(id), DenialReason::UnknownLink.as_str());
            return Ok(AccessGrant::denied());
        };

        let password_ok = match link.password_hash {
            Some(hash) => {
                let candidate = password.unwrap_or_default();
                tokio::task::spawn_blocking(move || hash.verify(&candidate))
                    .await
                    .map_err(|e| ShareError::Store(format!("password check failed: {e}")))?
            }
            None => true,
        };

        let attempt = AccessAttempt {
            now,
            password_ok,
            requester,
        };
        match self.store.record_access(id, &attempt).await? {
            Some(AccessDecision::Granted {
                artifact,
                allow_download,
            }) => {
                info!("Share access granted for {}", short(id));
                Ok(AccessGrant {
                    granted: true,
                    artifact: Some(artifact),
                    allow_download,
                })
            }
            Some(AccessDecision::Denied(reason)) => {
                info!("Share access denied for {}: {}", short(id), reason.as_str());
                Ok(AccessGrant::denied())
            }
            None => {
                warn!("Share link {} vanished during access", short(id));
                Ok(AccessGrant::denied())
            }
        }
    }

    pub async fn revoke_share(&self, id: &str, owner_token: &str) -> Result<(), ShareError> {
        self.owned_link(id, owner_token).await?;
        if !self.store.revoke(id).await? {
            return Err(ShareError::NotFound(id.to_string()));
        }
        info!("Revoked share link {}", short(id));
        Ok(())
    }

    pub async fn get_share(&self, id: &str, owner_token: &str) -> Result<ShareLinkView, ShareError> {
        let link = self.owned_link(id, owner_token).await?;
        Ok(link.view(self.share_url(&link.id)))
    }

    pub async fn access_log(
        &self,
        id: &str,
        owner_token: &str,
    ) -> Result<Vec<AccessLogEntry>, ShareError> {
        Ok(self.owned_link(id, owner_token).await?.access_log)
    }

    /// The link, if `owner_token` manages it.
    async fn owned_link(&self, id: &str, owner_token: &str) -> Result<ShareLink, ShareError> {
        let link = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| ShareError::NotFound(id.to_string()))?;
        if !link.is_owned_by(owner_token) {
            warn!("Owner check failed for share link {}", short(id));
            return Err(ShareError::Forbidden);
        }
        Ok(link)
    }

    /// Bytes behind a granted artifact, `None` if storage no longer has them.
    pub async fn artifact_bytes(&self, artifact: &ArtifactRef) -> Result<Option<Bytes>, ShareError> {
        self.artifacts
            .get(&artifact.key)
            .await
            .map_err(|e| ShareError::Store(e.to_string()))
    }
}

/// Log-safe prefix of a link id.
fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MemoryArtifactStore;
    use crate::share::store::MemoryShareStore;
    use chrono::Duration;

    fn service() -> ShareService {
        ShareService::new(
            Arc::new(MemoryShareStore::default()),
            Arc::new(MemoryArtifactStore::default()),
            "https://docs.example.com/".to_string(),
        )
    }

    fn artifact() -> ArtifactRef {
        ArtifactRef {
            key: "exports/d/j.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 4,
        }
    }

    fn config(is_public: bool, password: Option<&str>, max: Option<u32>) -> ShareConfig {
        ShareConfig {
            is_public,
            password: password.map(str::to_string),
            expires_at: None,
            max_access_count: max,
            allow_download: true,
        }
    }

    #[tokio::test]
    async fn test_single_use_public_link() {
        let service = service();
        let now = Utc::now();
        let created = service
            .create_share(artifact(), config(true, None, Some(1)), now)
            .await
            .unwrap();
        let view = &created.link;
        assert_eq!(view.url, format!("https://docs.example.com/s/{}", view.id));
        assert_eq!(view.id.len(), 64);

        let first = service
            .access_share(&view.id, None, RequesterInfo::default(), now)
            .await
            .unwrap();
        assert!(first.granted);
        assert_eq!(first.artifact, Some(artifact()));
        let owned = service.get_share(&view.id, &created.owner_token).await.unwrap();
        assert_eq!(owned.access_count, 1);

        let second = service
            .access_share(&view.id, None, RequesterInfo::default(), now)
            .await
            .unwrap();
        assert_eq!(second, AccessGrant::denied());
    }

    #[tokio::test]
    async fn test_create_share_validation() {
        let service = service();
        let now = Utc::now();
        assert!(matches!(
            service.create_share(artifact(), config(false, None, None), now).await,
            Err(ShareError::Invalid(_))
        ));
        assert!(matches!(
            service.create_share(artifact(), config(false, Some(""), None), now).await,
            Err(ShareError::Invalid(_))
        ));
        assert!(matches!(
            service.create_share(artifact(), config(true, None, Some(0)), now).await,
            Err(ShareError::Invalid(_))
        ));
        let mut past = config(true, None, None);
        past.expires_at = Some(now - Duration::seconds(1));
        assert!(matches!(
            service.create_share(artifact(), past, now).await,
            Err(ShareError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_password_protected_link() {
        let service = service();
        let now = Utc::now();
        let created = service
            .create_share(artifact(), config(false, Some("hunter2"), None), now)
            .await
            .unwrap();
        let view = &created.link;
        assert!(view.password_protected);

        for wrong in [None, Some("hunter3".to_string())] {
            let grant = service
                .access_share(&view.id, wrong, RequesterInfo::default(), now)
                .await
                .unwrap();
            assert!(!grant.granted);
        }
        let grant = service
            .access_share(&view.id, Some("hunter2".to_string()), RequesterInfo::default(), now)
            .await
            .unwrap();
        assert!(grant.granted);

        let log = service.access_log(&view.id, &created.owner_token).await.unwrap();
        let reasons: Vec<_> = log.iter().map(|e| e.reason).collect();
        assert_eq!(
            reasons,
            vec![Some(DenialReason::BadPassword), Some(DenialReason::BadPassword), None]
        );
    }

    #[tokio::test]
    async fn test_expired_link_denies_right_password() {
        let service = service();
        let now = Utc::now();
        let mut cfg = config(false, Some("pw"), None);
        cfg.expires_at = Some(now + Duration::hours(1));
        let created = service.create_share(artifact(), cfg, now).await.unwrap();
        let id = &created.link.id;

        let later = now + Duration::hours(2);
        let grant = service
            .access_share(id, Some("pw".to_string()), RequesterInfo::default(), later)
            .await
            .unwrap();
        assert!(!grant.granted);
        assert!(!service.get_share(id, &created.owner_token).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_revoke_and_unknown() {
        let service = service();
        let now = Utc::now();
        let created = service
            .create_share(artifact(), config(true, None, None), now)
            .await
            .unwrap();
        let id = &created.link.id;
        service.revoke_share(id, &created.owner_token).await.unwrap();
        let grant = service
            .access_share(id, None, RequesterInfo::default(), now)
            .await
            .unwrap();
        assert!(!grant.granted);

        let unknown = service
            .access_share("missing", None, RequesterInfo::default(), now)
            .await
            .unwrap();
        assert_eq!(unknown, AccessGrant::denied());
        assert!(matches!(
            service.revoke_share("missing", &created.owner_token).await,
            Err(ShareError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access_grants_exactly_n() {
        let service = Arc::new(service());
        let now = Utc::now();
        let created = service
            .create_share(artifact(), config(true, None, Some(5)), now)
            .await
            .unwrap();
        let view = &created.link;

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                let id = view.id.clone();
                tokio::spawn(async move {
                    service
                        .access_share(&id, None, RequesterInfo::default(), now)
                        .await
                        .unwrap()
                        .granted
                })
            })
            .collect();

        let mut granted = 0;
        for task in tasks {
            if task.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 5);
        let token = &created.owner_token;
        assert_eq!(service.access_log(&view.id, token).await.unwrap().len(), 20);
        assert_eq!(service.get_share(&view.id, token).await.unwrap().access_count, 5);
    }

    #[tokio::test]
    async fn test_management_requires_the_owner_token() {
        let service = service();
        let now = Utc::now();
        let created = service
            .create_share(artifact(), config(false, Some("hunter2"), None), now)
            .await
            .unwrap();
        let other = service
            .create_share(artifact(), config(true, None, None), now)
            .await
            .unwrap();
        let id = &created.link.id;
        assert_eq!(created.owner_token.len(), 64);

        for token in ["", id.as_str(), other.owner_token.as_str()] {
            assert!(matches!(service.get_share(id, token).await, Err(ShareError::Forbidden)));
            assert!(matches!(service.access_log(id, token).await, Err(ShareError::Forbidden)));
            assert!(matches!(service.revoke_share(id, token).await, Err(ShareError::Forbidden)));
        }
        let view = service.get_share(id, &created.owner_token).await.unwrap();
        assert!(view.is_active);
    }
}
