//! FormProgress: per-step completion percentages.
//!
//! A step's percentage is the share of its presence rules (required fields and
//! minimum list sizes, at any severity) the section currently satisfies. Item
//! rules count once per list entry. Steps with no presence rules read 100 once
//! the section holds any data.

use std::collections::BTreeMap;

use crate::models::draft::{DocumentKind, Draft};
use crate::wizard::schema::schema_for;
use crate::wizard::steps::{StepGraph, StepId};
use crate::wizard::validation::{rule_passes, StepScope};

pub type FormProgress = BTreeMap<StepId, u8>;

/// All-zero progress for every section step of `kind`.
pub fn initial_progress(kind: DocumentKind) -> FormProgress {
    StepGraph::for_kind(kind)
        .section_steps()
        .map(|(step, _)| (step, 0))
        .collect()
}

/// Recomputes every step from scratch.
pub fn compute_all(draft: &Draft) -> FormProgress {
    StepGraph::for_kind(draft.kind())
        .section_steps()
        .map(|(step, _)| (step, step_progress(step, draft)))
        .collect()
}

/// Completion percentage (0–100, rounded down) of one step.
pub fn step_progress(step: StepId, draft: &Draft) -> u8 {
    let Some(scope) = StepScope::for_step(step, draft) else {
        return 0;
    };
    let schema = schema_for(draft.kind(), step);

    let mut total = 0usize;
    let mut satisfied = 0usize;

    for rule in schema.rules.iter().filter(|r| r.check.is_presence()) {
        total += 1;
        if rule_passes(&scope.value, rule) {
            satisfied += 1;
        }
    }
    for item in scope.items() {
        for rule in schema.item_rules.iter().filter(|r| r.check.is_presence()) {
            total += 1;
            if rule_passes(item, rule) {
                satisfied += 1;
            }
        }
    }

    if total == 0 {
        let has_data = step
            .section()
            .map_or(false, |section| !draft.section_is_empty(section));
        return if has_data { 100 } else { 0 };
    }

    ((satisfied * 100) / total) as u8
}

/// Mean completion across all section steps, 0–100.
pub fn overall(progress: &FormProgress) -> u8 {
    if progress.is_empty() {
        return 0;
    }
    let sum: usize = progress.values().map(|p| *p as usize).sum();
    (sum / progress.len()) as u8
}
