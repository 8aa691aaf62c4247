//! Draft Store: the wizard state machine.
//!
//! `apply` is a pure function of `(state, action)`: it reads no clock, no
//! randomness and no shared state, so replaying the same actions always yields
//! the same state. Callers keep the returned state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::draft::{DocumentKind, Draft, SectionKey};
use crate::render::templates::TemplateId;
use crate::wizard::progress::{initial_progress, step_progress, FormProgress};
use crate::wizard::steps::{StepGraph, StepId};
use crate::wizard::validation::{validate_step, ValidationResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub draft: Draft,
    pub current_step: StepId,
    pub form_progress: FormProgress,
    pub selected_template: TemplateId,
}

impl WizardState {
    /// A fresh draft of `kind` positioned at the first step.
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            draft: Draft::new(kind),
            current_step: StepGraph::for_kind(kind).first(),
            form_progress: initial_progress(kind),
            selected_template: TemplateId::default_for(kind),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.draft.kind()
    }

    pub fn graph(&self) -> StepGraph {
        StepGraph::for_kind(self.kind())
    }

    /// Checks the cross-field invariants a restored state must satisfy.
    pub fn check_consistency(&self) -> Result<(), String> {
        if !self.graph().contains(self.current_step) {
            return Err(format!(
                "step '{}' is not part of the {} graph",
                self.current_step,
                self.kind()
            ));
        }
        if self.selected_template.kind() != self.kind() {
            return Err(format!(
                "template '{}' cannot render a {} draft",
                self.selected_template,
                self.kind()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    SetSection { section: SectionKey, data: Value },
    NextStep,
    PreviousStep,
    SetCurrentStep { step: StepId },
    SwitchDocumentType { kind: DocumentKind },
    SelectTemplate { template: TemplateId },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// `NEXT_STEP` vetoed by blocking validation errors on the current step.
    Blocked { validation: ValidationResult },
    NoOp { reason: String },
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub state: WizardState,
    pub outcome: Outcome,
}

impl Transition {
    fn applied(state: WizardState) -> Self {
        Self {
            state,
            outcome: Outcome::Applied,
        }
    }

    fn no_op(state: WizardState, reason: impl Into<String>) -> Self {
        Self {
            state,
            outcome: Outcome::NoOp {
                reason: reason.into(),
            },
        }
    }

    fn rejected(state: WizardState, reason: impl Into<String>) -> Self {
        Self {
            state,
            outcome: Outcome::Rejected {
                reason: reason.into(),
            },
        }
    }

    /// Whether the state changed and should be persisted.
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, Outcome::Applied)
    }
}

/// Applies one action to the wizard state.
pub fn apply(state: WizardState, action: Action) -> Transition {
    match action {
        Action::SetSection { section, data } => set_section(state, section, &data),
        Action::NextStep => next_step(state),
        Action::PreviousStep => match state.graph().previous(state.current_step) {
            Some(previous) => Transition::applied(WizardState {
                current_step: previous,
                ..state
            }),
            None => Transition::no_op(state, "already at the first step"),
        },
        Action::SetCurrentStep { step } => {
            if !state.graph().contains(step) {
                let reason = format!("step '{step}' is not part of the {} wizard", state.kind());
                return Transition::rejected(state, reason);
            }
            Transition::applied(WizardState {
                current_step: step,
                ..state
            })
        }
        Action::SwitchDocumentType { kind } => Transition::applied(WizardState::new(kind)),
        Action::SelectTemplate { template } => {
            if template.kind() != state.kind() {
                let reason = format!(
                    "template '{template}' is for {} documents, not {}",
                    template.kind(),
                    state.kind()
                );
                return Transition::rejected(state, reason);
            }
            Transition::applied(WizardState {
                selected_template: template,
                ..state
            })
        }
    }
}

/// Replays a sequence of actions from `initial`, returning the final state.
pub fn replay(initial: WizardState, actions: impl IntoIterator<Item = Action>) -> WizardState {
    actions
        .into_iter()
        .fold(initial, |state, action| apply(state, action).state)
}

fn set_section(state: WizardState, section: SectionKey, data: &Value) -> Transition {
    let draft = match state.draft.with_section(section, data) {
        Ok(draft) => draft,
        Err(e) => return Transition::rejected(state, e.to_string()),
    };

    let mut form_progress = state.form_progress;
    if let Some(step) = StepGraph::for_kind(draft.kind()).step_for_section(section) {
        form_progress.insert(step, step_progress(step, &draft));
    }

    Transition::applied(WizardState {
        draft,
        form_progress,
        ..state
    })
}

fn next_step(state: WizardState) -> Transition {
    let graph = state.graph();
    let Some(next) = graph.next(state.current_step) else {
        return Transition::no_op(state, "already at the final step");
    };

    let validation = validate_step(state.current_step, &state.draft);
    if !validation.is_valid {
        return Transition {
            state,
            outcome: Outcome::Blocked { validation },
        };
    }

    Transition::applied(WizardState {
        current_step: next,
        ..state
    })
}
