use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::draft::DocumentKind;
use crate::persistence::FlushOutcome;
use crate::render::{render, templates_for, RenderSurface, TemplateSpec};
use crate::state::AppState;
use crate::wizard::progress::overall;
use crate::wizard::session::DraftSession;
use crate::wizard::steps::StepId;
use crate::wizard::store::{Action, Transition, WizardState};
use crate::wizard::validation::{validate_all, validate_step, ValidationResult};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDraftRequest {
    pub kind: DocumentKind,
    pub session_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub session_id: Uuid,
    pub restored: bool,
    pub in_memory_only: bool,
    pub overall_progress: u8,
    pub state: WizardState,
    /// Validation of the current step.
    pub validation: ValidationResult,
}

#[derive(Serialize)]
pub struct FlushResponse {
    pub outcome: FlushOutcome,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseResponse {
    pub outcome: FlushOutcome,
    /// Unfinished exports of this draft that were abandoned.
    pub cancelled_exports: usize,
}

#[derive(Deserialize)]
pub struct KindQuery {
    pub kind: DocumentKind,
}

pub(crate) async fn find_session(state: &AppState, id: Uuid) -> Result<Arc<DraftSession>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Draft session {id} not found")))
}

async fn draft_response(session: &DraftSession, restored: bool) -> DraftResponse {
    let wizard = session.state().await;
    DraftResponse {
        session_id: session.id,
        restored,
        in_memory_only: session.is_in_memory_only(),
        overall_progress: overall(&wizard.form_progress),
        validation: validate_step(wizard.current_step, &wizard.draft),
        state: wizard,
    }
}

/// POST /api/v1/drafts
pub async fn handle_open_draft(
    State(state): State<AppState>,
    Json(req): Json<OpenDraftRequest>,
) -> Result<(StatusCode, Json<DraftResponse>), AppError> {
    let (session, restored) = state.sessions.open(req.kind, req.session_id).await;
    let status = if restored {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(draft_response(&session, restored).await)))
}

/// GET /api/v1/drafts/:id
pub async fn handle_get_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftResponse>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(Json(draft_response(&session, true).await))
}

/// DELETE /api/v1/drafts/:id
pub async fn handle_close_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CloseResponse>, AppError> {
    let outcome = state
        .sessions
        .close(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Draft session {id} not found")))?;
    let cancelled_exports = state.exports.cancel_for_draft(id);
    Ok(Json(CloseResponse {
        outcome,
        cancelled_exports,
    }))
}

/// POST /api/v1/drafts/:id/actions
pub async fn handle_dispatch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(action): Json<Action>,
) -> Result<Json<Transition>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(Json(session.dispatch(action).await))
}

/// GET /api/v1/drafts/:id/steps/:step/validation
pub async fn handle_validate_step(
    State(state): State<AppState>,
    Path((id, step)): Path<(Uuid, StepId)>,
) -> Result<Json<ValidationResult>, AppError> {
    let wizard = find_session(&state, id).await?.state().await;
    if !wizard.graph().contains(step) {
        return Err(AppError::NotFound(format!(
            "Step '{step}' is not part of the {} wizard",
            wizard.kind()
        )));
    }
    Ok(Json(validate_step(step, &wizard.draft)))
}

/// GET /api/v1/drafts/:id/validation
/// Every section step, keyed by step id.
pub async fn handle_validate_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BTreeMap<StepId, ValidationResult>>, AppError> {
    let wizard = find_session(&state, id).await?.state().await;
    Ok(Json(validate_all(&wizard.draft)))
}

/// POST /api/v1/drafts/:id/flush
pub async fn handle_flush(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlushResponse>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(Json(FlushResponse {
        outcome: session.flush().await,
    }))
}

/// GET /api/v1/drafts/:id/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RenderSurface>, AppError> {
    let wizard = find_session(&state, id).await?.state().await;
    Ok(Json(render(&wizard.draft, wizard.selected_template)?))
}

/// GET /api/v1/templates?kind=
pub async fn handle_list_templates(
    Query(params): Query<KindQuery>,
) -> Json<Vec<&'static TemplateSpec>> {
    Json(templates_for(params.kind))
}
