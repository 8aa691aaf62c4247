pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::export::handlers as export;
use crate::share::handlers as share;
use crate::state::AppState;
use crate::wizard::handlers as wizard;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Wizard API
        .route("/api/v1/drafts", post(wizard::handle_open_draft))
        .route(
            "/api/v1/drafts/:id",
            get(wizard::handle_get_draft).delete(wizard::handle_close_draft),
        )
        .route("/api/v1/drafts/:id/actions", post(wizard::handle_dispatch))
        .route(
            "/api/v1/drafts/:id/steps/:step/validation",
            get(wizard::handle_validate_step),
        )
        .route(
            "/api/v1/drafts/:id/validation",
            get(wizard::handle_validate_draft),
        )
        .route("/api/v1/drafts/:id/flush", post(wizard::handle_flush))
        .route("/api/v1/drafts/:id/preview", get(wizard::handle_preview))
        .route("/api/v1/templates", get(wizard::handle_list_templates))
        // Export API
        .route(
            "/api/v1/drafts/:id/exports/estimate",
            get(export::handle_estimate),
        )
        .route(
            "/api/v1/drafts/:id/exports",
            post(export::handle_request_export),
        )
        .route(
            "/api/v1/exports/:id",
            get(export::handle_get_export).delete(export::handle_cancel_export),
        )
        .route(
            "/api/v1/exports/:id/download",
            get(export::handle_download_export),
        )
        // Share API
        .route("/api/v1/shares", post(share::handle_create_share))
        .route(
            "/api/v1/shares/:id",
            get(share::handle_get_share).delete(share::handle_revoke_share),
        )
        .route("/api/v1/shares/:id/log", get(share::handle_access_log))
        .route("/api/v1/shares/:id/access", post(share::handle_access_share))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::export::rasterizer::BlockRasterizer;
    use crate::export::{ExportPipeline, ExportSettings, MemoryArtifactStore};
    use crate::persistence::MemorySnapshotStorage;
    use crate::share::{MemoryShareStore, ShareService};
    use crate::wizard::session::SessionRegistry;

    fn app() -> Router {
        let artifacts = Arc::new(MemoryArtifactStore::default());
        let state = AppState {
            sessions: Arc::new(SessionRegistry::new(
                Arc::new(MemorySnapshotStorage::default()),
                Duration::from_millis(50),
            )),
            exports: Arc::new(ExportPipeline::new(
                Arc::new(BlockRasterizer),
                artifacts.clone(),
                ExportSettings::default(),
            )),
            shares: Arc::new(ShareService::new(
                Arc::new(MemoryShareStore::default()),
                artifacts,
                "http://localhost:8080".to_string(),
            )),
        };
        build_router(state)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        call_as(app, method, uri, body, None).await
    }

    async fn call_as(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
        owner_token: Option<&str>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = owner_token {
            builder = builder.header(share::OWNER_TOKEN_HEADER, token);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn call_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = call(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn owner_json(app: &Router, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let (status, bytes) = call_as(app, method, uri, None, token).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn open_resume(app: &Router) -> String {
        let (status, body) =
            call_json(app, Method::POST, "/api/v1/drafts", Some(json!({"kind": "resume"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["sessionId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call_json(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_wizard_blocks_then_advances() {
        let app = app();
        let id = open_resume(&app).await;
        let actions = format!("/api/v1/drafts/{id}/actions");

        call_json(
            &app,
            Method::POST,
            &actions,
            Some(json!({
                "type": "SET_SECTION",
                "section": "personalInfo",
                "data": {"fullName": "Ann Lee", "email": "ann@x.com"}
            })),
        )
        .await;

        let (status, body) =
            call_json(&app, Method::POST, &actions, Some(json!({"type": "NEXT_STEP"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["status"], "blocked");
        assert!(body["outcome"]["validation"]["errors"]["phone"].is_string());

        call_json(
            &app,
            Method::POST,
            &actions,
            Some(json!({
                "type": "SET_SECTION",
                "section": "personalInfo",
                "data": {"phone": "+1 555 123 4567", "address": "1 Main St"}
            })),
        )
        .await;
        let (_, body) =
            call_json(&app, Method::POST, &actions, Some(json!({"type": "NEXT_STEP"}))).await;
        assert_eq!(body["outcome"]["status"], "applied");
        assert_eq!(body["state"]["currentStep"], "summary");
    }

    #[tokio::test]
    async fn test_unknown_draft_is_404_with_error_body() {
        let (status, body) = call_json(
            &app(),
            Method::GET,
            &format!("/api/v1/drafts/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_foreign_step_validation_is_404() {
        let app = app();
        let id = open_resume(&app).await;
        let (status, _) = call_json(
            &app,
            Method::GET,
            &format!("/api/v1/drafts/{id}/steps/horoscope/validation"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_whole_draft_validation() {
        let app = app();
        let id = open_resume(&app).await;
        let (status, body) = call_json(
            &app,
            Method::GET,
            &format!("/api/v1/drafts/{id}/validation"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["personal"]["isValid"], false);
        assert!(body.get("preview").is_none());
    }

    #[tokio::test]
    async fn test_templates_by_kind() {
        let (status, body) =
            call_json(&app(), Method::GET, "/api/v1/templates?kind=biodata", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_export_requires_preview_step() {
        let app = app();
        let id = open_resume(&app).await;
        let (status, body) = call_json(
            &app,
            Method::POST,
            &format!("/api/v1/drafts/{id}/exports"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_unknown_share_access_is_generic_403() {
        let (status, body) = call_json(
            &app(),
            Method::POST,
            "/api/v1/shares/deadbeef/access",
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "Access denied");
    }

    /// Fills a résumé to the preview step and exports it. Returns the export id.
    async fn completed_export(app: &Router) -> String {
        let id = open_resume(app).await;
        let actions = format!("/api/v1/drafts/{id}/actions");
        call_json(
            app,
            Method::POST,
            &actions,
            Some(json!({
                "type": "SET_SECTION",
                "section": "personalInfo",
                "data": {"fullName": "Ann Lee", "email": "ann@x.com",
                         "phone": "+1 555 123 4567", "address": "1 Main St"}
            })),
        )
        .await;
        call_json(
            app,
            Method::POST,
            &actions,
            Some(json!({"type": "SET_CURRENT_STEP", "step": "preview"})),
        )
        .await;

        let (status, estimate) = call_json(
            app,
            Method::GET,
            &format!("/api/v1/drafts/{id}/exports/estimate"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let low = estimate["bytes"]["low"].as_u64().unwrap();
        assert!(low <= estimate["bytes"]["high"].as_u64().unwrap());

        let (status, job) = call_json(
            app,
            Method::POST,
            &format!("/api/v1/drafts/{id}/exports"),
            Some(json!({"quality": "low"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let export_id = job["id"].as_str().unwrap().to_string();

        let mut finished = Value::Null;
        for _ in 0..500 {
            let (_, job) =
                call_json(app, Method::GET, &format!("/api/v1/exports/{export_id}"), None).await;
            if job["status"] == "completed" || job["status"] == "failed" {
                finished = job;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(finished["status"], "completed", "{finished}");
        export_id
    }

    #[tokio::test]
    async fn test_export_then_single_use_share() {
        let app = app();
        let export_id = completed_export(&app).await;

        let (status, bytes) = call(
            &app,
            Method::GET,
            &format!("/api/v1/exports/{export_id}/download"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"%PDF-1.4"));

        let (status, link) = call_json(
            &app,
            Method::POST,
            "/api/v1/shares",
            Some(json!({"exportId": export_id, "isPublic": true, "maxAccessCount": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let link_id = link["id"].as_str().unwrap().to_string();
        let token = link["ownerToken"].as_str().unwrap().to_string();
        assert!(link.get("passwordHash").is_none());
        assert!(link.get("ownerTokenHash").is_none());

        let access = format!("/api/v1/shares/{link_id}/access");
        let (status, bytes) = call(&app, Method::POST, &access, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"%PDF-1.4"));
        let (status, _) = call(&app, Method::POST, &access, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, log) = owner_json(
            &app,
            Method::GET,
            &format!("/api/v1/shares/{link_id}/log"),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let log = log.as_array().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0]["granted"], true);
        assert_eq!(log[1]["reason"], "inactive");
    }

    #[tokio::test]
    async fn test_share_management_needs_owner_token() {
        let app = app();
        let export_id = completed_export(&app).await;
        let (status, link) = call_json(
            &app,
            Method::POST,
            "/api/v1/shares",
            Some(json!({"exportId": export_id, "isPublic": false, "password": "hunter2"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let link_id = link["id"].as_str().unwrap().to_string();
        let token = link["ownerToken"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/api/v1/shares/{link_id}/access"),
            Some(json!({"password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // the link id alone is not enough to inspect or revoke
        let link_uri = format!("/api/v1/shares/{link_id}");
        let log_uri = format!("/api/v1/shares/{link_id}/log");
        let zeros = "0".repeat(64);
        for credential in [None, Some(""), Some(link_id.as_str()), Some(zeros.as_str())] {
            for (method, uri) in [
                (Method::GET, &link_uri),
                (Method::GET, &log_uri),
                (Method::DELETE, &link_uri),
            ] {
                let (status, body) = owner_json(&app, method, uri, credential).await;
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body["error"]["code"], "FORBIDDEN");
            }
        }

        let (status, view) = owner_json(&app, Method::GET, &link_uri, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["isActive"], true);
        assert!(view.get("ownerToken").is_none());

        let (status, log) = owner_json(&app, Method::GET, &log_uri, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(log.as_array().unwrap().len(), 1);
        assert_eq!(log[0]["reason"], "bad_password");

        let (status, _) = call_as(&app, Method::DELETE, &link_uri, None, Some(&token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, view) = owner_json(&app, Method::GET, &link_uri, Some(&token)).await;
        assert_eq!(view["isActive"], false);
    }

    #[tokio::test]
    async fn test_close_draft_reports_cancelled_exports() {
        let app = app();
        let id = open_resume(&app).await;
        let draft = format!("/api/v1/drafts/{id}");
        let (status, body) = call_json(&app, Method::DELETE, &draft, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cancelledExports"], 0);
        let (status, _) = call_json(&app, Method::DELETE, &draft, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
