use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::export::ArtifactRef;
use crate::share::password::{verify_owner_token, PasswordHash};

/// Owner-supplied settings for a new link.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareConfig {
    pub is_public: bool,
    pub password: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_access_count: Option<u32>,
    #[serde(default = "default_allow_download")]
    pub allow_download: bool,
}

fn default_allow_download() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct ShareLink {
    pub id: String,
    pub artifact: ArtifactRef,
    pub is_public: bool,
    pub password_hash: Option<PasswordHash>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_access_count: Option<u32>,
    pub allow_download: bool,
    pub access_count: u32,
    pub access_log: Vec<AccessLogEntry>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// SHA-256 digest of the owner token. Links without one cannot be managed.
    pub owner_token_hash: Option<String>,
}

impl ShareLink {
    pub fn is_owned_by(&self, owner_token: &str) -> bool {
        self.owner_token_hash
            .as_deref()
            .is_some_and(|digest| verify_owner_token(digest, owner_token))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| now > at)
    }

    pub fn limit_reached(&self) -> bool {
        self.max_access_count
            .map_or(false, |max| self.access_count >= max)
    }

    pub fn view(&self, url: String) -> ShareLinkView {
        ShareLinkView {
            id: self.id.clone(),
            url,
            is_public: self.is_public,
            password_protected: self.password_hash.is_some(),
            expires_at: self.expires_at,
            max_access_count: self.max_access_count,
            allow_download: self.allow_download,
            access_count: self.access_count,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// A new link with the token that manages it. The token is returned only here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShare {
    #[serde(flatten)]
    pub link: ShareLinkView,
    pub owner_token: String,
}

/// Owner-facing view of a link. Never carries the password or owner token hashes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinkView {
    pub id: String,
    pub url: String,
    pub is_public: bool,
    pub password_protected: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_access_count: Option<u32>,
    pub allow_download: bool,
    pub access_count: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    UnknownLink,
    Inactive,
    Expired,
    LimitReached,
    BadPassword,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::UnknownLink => "unknown_link",
            DenialReason::Inactive => "inactive",
            DenialReason::Expired => "expired",
            DenialReason::LimitReached => "limit_reached",
            DenialReason::BadPassword => "bad_password",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unknown_link" => Some(DenialReason::UnknownLink),
            "inactive" => Some(DenialReason::Inactive),
            "expired" => Some(DenialReason::Expired),
            "limit_reached" => Some(DenialReason::LimitReached),
            "bad_password" => Some(DenialReason::BadPassword),
            _ => None,
        }
    }
}

/// Coarse requester identity: network prefix and browser product only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterInfo {
    pub network: Option<String>,
    pub agent: Option<String>,
}

impl RequesterInfo {
    /// Truncates `ip` to its /24 (IPv4) or /48 (IPv6) prefix and keeps only the
    /// leading product token of `user_agent`.
    pub fn coarse(ip: Option<IpAddr>, user_agent: Option<&str>) -> Self {
        let network = ip.map(|ip| match ip {
            IpAddr::V4(v4) => {
                let [a, b, c, _] = v4.octets();
                format!("{a}.{b}.{c}.0/24")
            }
            IpAddr::V6(v6) => {
                let s = v6.segments();
                format!("{:x}:{:x}:{:x}::/48", s[0], s[1], s[2])
            }
        });
        let agent = user_agent
            .and_then(|ua| ua.split_whitespace().next())
            .map(|token| token.chars().take(64).collect());
        Self { network, agent }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub at: DateTime<Utc>,
    pub granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
    pub requester: RequesterInfo,
}

/// One access attempt, with the password already checked.
#[derive(Debug, Clone)]
pub struct AccessAttempt {
    pub now: DateTime<Utc>,
    pub password_ok: bool,
    pub requester: RequesterInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    Granted {
        artifact: ArtifactRef,
        allow_download: bool,
    },
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted { .. })
    }
}
