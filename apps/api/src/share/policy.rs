//! Access decision for a single attempt against a share link.
//!
//! `evaluate` is the whole check-and-increment: callers hold whatever lock
//! or row lock makes the link exclusive for the duration of the call.

use crate::share::models::{AccessAttempt, AccessDecision, AccessLogEntry, DenialReason, ShareLink};

/// Decides `attempt`, updates the counters and deactivation flag on `link`,
/// and appends one log entry whatever the outcome.
pub fn evaluate(link: &mut ShareLink, attempt: &AccessAttempt) -> AccessDecision {
    let decision = decide(link, attempt);
    let entry = AccessLogEntry {
        at: attempt.now,
        granted: decision.is_granted(),
        reason: match &decision {
            AccessDecision::Denied(reason) => Some(*reason),
            AccessDecision::Granted { .. } => None,
        },
        requester: attempt.requester.clone(),
    };
    link.access_log.push(entry);
    decision
}

fn decide(link: &mut ShareLink, attempt: &AccessAttempt) -> AccessDecision {
    if !link.is_active {
        return AccessDecision::Denied(DenialReason::Inactive);
    }
    if link.is_expired(attempt.now) {
        link.is_active = false;
        return AccessDecision::Denied(DenialReason::Expired);
    }
    if link.limit_reached() {
        link.is_active = false;
        return AccessDecision::Denied(DenialReason::LimitReached);
    }
    if !attempt.password_ok {
        return AccessDecision::Denied(DenialReason::BadPassword);
    }

    link.access_count += 1;
    if link.limit_reached() {
        link.is_active = false;
    }
    AccessDecision::Granted {
        artifact: link.artifact.clone(),
        allow_download: link.allow_download,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ArtifactRef;
    use crate::share::models::RequesterInfo;
    use chrono::{Duration, Utc};

    fn link(max: Option<u32>) -> ShareLink {
        ShareLink {
            id: "abc".to_string(),
            artifact: ArtifactRef {
                key: "exports/d/j.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                size_bytes: 10,
            },
            is_public: true,
            password_hash: None,
            expires_at: None,
            max_access_count: max,
            allow_download: true,
            access_count: 0,
            access_log: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
            owner_token_hash: None,
        }
    }

    fn attempt(password_ok: bool) -> AccessAttempt {
        AccessAttempt {
            now: Utc::now(),
            password_ok,
            requester: RequesterInfo::default(),
        }
    }

    #[test]
    fn test_max_access_count_grants_exactly_n() {
        let mut link = link(Some(3));
        let granted = (0..5)
            .filter(|_| evaluate(&mut link, &attempt(true)).is_granted())
            .count();
        assert_eq!(granted, 3);
        assert_eq!(link.access_count, 3);
        assert!(!link.is_active);
        assert_eq!(link.access_log.len(), 5);
        assert_eq!(link.access_log[4].reason, Some(DenialReason::Inactive));
    }

    #[test]
    fn test_single_use_link() {
        let mut link = link(Some(1));
        let first = evaluate(&mut link, &attempt(true));
        assert!(first.is_granted());
        assert_eq!(link.access_count, 1);
        assert!(!evaluate(&mut link, &attempt(true)).is_granted());
    }

    #[test]
    fn test_expired_link_denies_even_with_right_password() {
        let mut link = link(None);
        link.expires_at = Some(Utc::now() - Duration::minutes(1));
        let decision = evaluate(&mut link, &attempt(true));
        assert_eq!(decision, AccessDecision::Denied(DenialReason::Expired));
        assert!(!link.is_active);
        assert_eq!(link.access_count, 0);
    }

    #[test]
    fn test_bad_password_is_logged_but_not_counted() {
        let mut link = link(Some(1));
        let decision = evaluate(&mut link, &attempt(false));
        assert_eq!(decision, AccessDecision::Denied(DenialReason::BadPassword));
        assert_eq!(link.access_count, 0);
        assert!(link.is_active);
        assert!(!link.access_log[0].granted);
        assert!(evaluate(&mut link, &attempt(true)).is_granted());
    }

    #[test]
    fn test_revoked_link_denies() {
        let mut link = link(None);
        link.is_active = false;
        assert_eq!(
            evaluate(&mut link, &attempt(true)),
            AccessDecision::Denied(DenialReason::Inactive)
        );
    }

    #[test]
    fn test_grant_carries_download_flag() {
        let mut link = link(None);
        link.allow_download = false;
        match evaluate(&mut link, &attempt(true)) {
            AccessDecision::Granted { allow_download, artifact } => {
                assert!(!allow_download);
                assert_eq!(artifact.key, "exports/d/j.pdf");
            }
            other => panic!("expected grant, got {other:?}"),
        }
    }
}
