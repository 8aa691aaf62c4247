//! Snapshot codec.
//!
//! Current format (version 2):
//! `{"version":2,"draftKind":"resume","currentStep":"summary","formProgress":{...},
//!   "selectedTemplate":"classic","draft":{"kind":"resume","sections":{...}}}`
//!
//! Version 1 stored the template under `template` and carried no progress map;
//! it is upgraded on decode and its progress recomputed from the draft.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use super::PersistenceError;
use crate::models::draft::{DocumentKind, Draft};
use crate::render::templates::TemplateId;
use crate::wizard::progress::{compute_all, FormProgress};
use crate::wizard::steps::StepId;
use crate::wizard::store::WizardState;

pub const SNAPSHOT_VERSION: u64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u64,
    pub draft_kind: DocumentKind,
    pub current_step: StepId,
    pub form_progress: FormProgress,
    pub selected_template: TemplateId,
    pub draft: Draft,
}

impl Snapshot {
    pub fn capture(state: &WizardState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            draft_kind: state.kind(),
            current_step: state.current_step,
            form_progress: state.form_progress.clone(),
            selected_template: state.selected_template,
            draft: state.draft.clone(),
        }
    }

    /// Rebuilds the wizard state, rejecting snapshots whose parts disagree.
    pub fn into_state(self) -> Result<WizardState, PersistenceError> {
        if self.draft_kind != self.draft.kind() {
            return Err(PersistenceError::Inconsistent(format!(
                "draftKind is {} but the draft is a {}",
                self.draft_kind,
                self.draft.kind()
            )));
        }
        let state = WizardState {
            draft: self.draft,
            current_step: self.current_step,
            form_progress: self.form_progress,
            selected_template: self.selected_template,
        };
        state
            .check_consistency()
            .map_err(PersistenceError::Inconsistent)?;
        Ok(state)
    }
}

pub fn snapshot_key(session_id: Uuid) -> String {
    format!("wizard:snapshot:v{SNAPSHOT_VERSION}:{session_id}")
}

/// Key version-1 snapshots were written under.
pub fn legacy_snapshot_key(session_id: Uuid) -> String {
    format!("wizard:snapshot:v1:{session_id}")
}

pub fn encode(snapshot: &Snapshot) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(snapshot)?)
}

pub fn decode(raw: &str) -> Result<Snapshot, PersistenceError> {
    let mut value: Value = serde_json::from_str(raw)?;
    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or(PersistenceError::MissingVersion)?;

    match version {
        SNAPSHOT_VERSION => Ok(serde_json::from_value(value)?),
        1 => {
            let fields = value
                .as_object_mut()
                .ok_or(PersistenceError::MissingVersion)?;
            upgrade_v1(fields);
            let mut snapshot: Snapshot = serde_json::from_value(value)?;
            snapshot.form_progress = compute_all(&snapshot.draft);
            Ok(snapshot)
        }
        other => Err(PersistenceError::UnsupportedVersion(other)),
    }
}

fn upgrade_v1(fields: &mut Map<String, Value>) {
    if let Some(template) = fields.remove("template") {
        fields.insert("selectedTemplate".to_string(), template);
    }
    fields
        .entry("formProgress")
        .or_insert_with(|| Value::Object(Map::new()));
    fields.insert("version".to_string(), Value::from(SNAPSHOT_VERSION));
}

/// Decodes a stored snapshot, falling back to a fresh `kind` draft when nothing
/// usable is stored. Returns whether the state came from storage.
pub fn restore_or_fresh(raw: Option<&str>, kind: DocumentKind) -> (WizardState, bool) {
    let Some(raw) = raw else {
        return (WizardState::new(kind), false);
    };
    match decode(raw).and_then(Snapshot::into_state) {
        Ok(state) => (state, true),
        Err(e) => {
            warn!("Discarding stored wizard snapshot: {e}");
            (WizardState::new(kind), false)
        }
    }
}
