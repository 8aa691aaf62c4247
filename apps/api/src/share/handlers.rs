use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::handlers::artifact_response;
use crate::share::models::{AccessLogEntry, CreatedShare, RequesterInfo, ShareConfig, ShareLinkView};
use crate::state::AppState;

/// Carries the token returned by `POST /api/v1/shares`.
pub const OWNER_TOKEN_HEADER: &str = "x-owner-token";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    pub export_id: Uuid,
    #[serde(flatten)]
    pub config: ShareConfig,
}

#[derive(Deserialize, Default)]
pub struct AccessRequest {
    pub password: Option<String>,
}

/// POST /api/v1/shares
/// The response carries `ownerToken`, needed for every other owner endpoint.
pub async fn handle_create_share(
    State(state): State<AppState>,
    Json(req): Json<CreateShareRequest>,
) -> Result<(StatusCode, Json<CreatedShare>), AppError> {
    let artifact = state.exports.artifact(req.export_id).ok_or_else(|| {
        AppError::NotFound(format!("No completed export {}", req.export_id))
    })?;
    let created = state
        .shares
        .create_share(artifact, req.config, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/shares/:id
pub async fn handle_get_share(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ShareLinkView>, AppError> {
    Ok(Json(state.shares.get_share(&id, owner_token(&headers)).await?))
}

/// DELETE /api/v1/shares/:id
pub async fn handle_revoke_share(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    state.shares.revoke_share(&id, owner_token(&headers)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/shares/:id/log
pub async fn handle_access_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<AccessLogEntry>>, AppError> {
    Ok(Json(state.shares.access_log(&id, owner_token(&headers)).await?))
}

/// POST /api/v1/shares/:id/access
/// Any denial is a bare 403; the reason is only in the owner's log.
pub async fn handle_access_share(
    State(state): State<AppState>,
    Path(id): Path<String>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Option<Json<AccessRequest>>,
) -> Result<Response, AppError> {
    let password = body.and_then(|Json(req)| req.password);
    let requester = requester_info(&headers, connect.map(|ConnectInfo(addr)| addr.ip()));

    let grant = state
        .shares
        .access_share(&id, password, requester, Utc::now())
        .await?;
    let artifact = match grant.artifact {
        Some(artifact) if grant.granted => artifact,
        _ => return Err(AppError::Forbidden),
    };

    let bytes = state
        .shares
        .artifact_bytes(&artifact)
        .await?
        .ok_or_else(|| AppError::NotFound("Shared document is no longer available".to_string()))?;
    Ok(artifact_response(&artifact, bytes, grant.allow_download))
}

/// Empty when the header is absent, which never matches a stored digest.
fn owner_token(headers: &HeaderMap) -> &str {
    headers
        .get(OWNER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default()
}

/// Prefers the first `X-Forwarded-For` hop over the socket peer.
fn requester_info(headers: &HeaderMap, peer: Option<IpAddr>) -> RequesterInfo {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
    let agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    RequesterInfo::coarse(forwarded.or(peer), agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::net::Ipv4Addr;

    #[test]
    fn test_requester_info_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.23, 10.0.0.1"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8.5.0"));
        let info = requester_info(&headers, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert_eq!(info.network.as_deref(), Some("198.51.100.0/24"));
        assert_eq!(info.agent.as_deref(), Some("curl/8.5.0"));

        let info = requester_info(&HeaderMap::new(), Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert_eq!(info.network.as_deref(), Some("127.0.0.0/24"));
    }

    #[test]
    fn test_owner_token_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(owner_token(&headers), "");
        headers.insert(OWNER_TOKEN_HEADER, HeaderValue::from_static(" abc123 "));
        assert_eq!(owner_token(&headers), "abc123");
    }
}
