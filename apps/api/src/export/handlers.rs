use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::assembler::estimate_file_size;
use crate::export::job::{ExportJob, ExportOptions, Quality};
use crate::export::ArtifactRef;
use crate::render::render;
use crate::state::AppState;
use crate::wizard::handlers::find_session;
use crate::wizard::steps::StepId;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub page_count: usize,
    /// Predicted bytes per quality tier.
    pub bytes: BTreeMap<&'static str, u64>,
}

/// GET /api/v1/drafts/:id/exports/estimate
pub async fn handle_estimate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EstimateResponse>, AppError> {
    let wizard = find_session(&state, id).await?.state().await;
    let surface = render(&wizard.draft, wizard.selected_template)?;
    let bytes = Quality::ALL
        .iter()
        .map(|q| (q.as_str(), estimate_file_size(&surface, *q)))
        .collect();
    Ok(Json(EstimateResponse {
        page_count: surface.page_count(),
        bytes,
    }))
}

/// POST /api/v1/drafts/:id/exports
pub async fn handle_request_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(options): Json<ExportOptions>,
) -> Result<(StatusCode, Json<ExportJob>), AppError> {
    let wizard = find_session(&state, id).await?.state().await;
    if wizard.current_step != StepId::Preview {
        return Err(AppError::UnprocessableEntity(
            "Export is available once the wizard reaches the preview step".to_string(),
        ));
    }
    let surface = render(&wizard.draft, wizard.selected_template)?;
    let job = state.exports.request_export(surface, id, options);
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// GET /api/v1/exports/:id
pub async fn handle_get_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExportJob>, AppError> {
    state
        .exports
        .job(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Export {id} not found")))
}

/// DELETE /api/v1/exports/:id
pub async fn handle_cancel_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExportJob>, AppError> {
    state
        .exports
        .cancel(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Export {id} not found")))
}

/// GET /api/v1/exports/:id/download
pub async fn handle_download_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let artifact = state
        .exports
        .artifact(id)
        .ok_or_else(|| AppError::NotFound(format!("No completed export {id}")))?;
    let bytes = state
        .exports
        .artifact_bytes(&artifact)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Artifact for export {id} is gone")))?;
    Ok(artifact_response(&artifact, bytes, true))
}

/// Serves artifact bytes, as a download or inline for view-only access.
pub fn artifact_response(artifact: &ArtifactRef, bytes: Bytes, download: bool) -> Response {
    let file_name = artifact
        .key
        .rsplit('/')
        .next()
        .unwrap_or("document.pdf")
        .to_string();
    let disposition = if download {
        format!("attachment; filename=\"{file_name}\"")
    } else {
        format!("inline; filename=\"{file_name}\"")
    };
    (
        [
            (header::CONTENT_TYPE, artifact.content_type.clone()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}
