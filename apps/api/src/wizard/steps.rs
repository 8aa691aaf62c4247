//! Step Graph: the ordered wizard steps for each document kind.
//!
//! Each non-terminal step edits exactly one draft section; `preview` is terminal.

use serde::{Deserialize, Serialize};

use crate::models::draft::{DocumentKind, SectionKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    Personal,
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
    Languages,
    Contact,
    Family,
    Occupation,
    Lifestyle,
    PartnerPreference,
    Horoscope,
    Photos,
    About,
    Preview,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::Personal => "personal",
            StepId::Summary => "summary",
            StepId::Experience => "experience",
            StepId::Education => "education",
            StepId::Skills => "skills",
            StepId::Projects => "projects",
            StepId::Certifications => "certifications",
            StepId::Languages => "languages",
            StepId::Contact => "contact",
            StepId::Family => "family",
            StepId::Occupation => "occupation",
            StepId::Lifestyle => "lifestyle",
            StepId::PartnerPreference => "partner-preference",
            StepId::Horoscope => "horoscope",
            StepId::Photos => "photos",
            StepId::About => "about",
            StepId::Preview => "preview",
        }
    }

    /// The section a step edits. `preview` edits nothing.
    pub fn section(&self) -> Option<SectionKey> {
        match self {
            StepId::Personal => Some(SectionKey::PersonalInfo),
            StepId::Summary => Some(SectionKey::Summary),
            StepId::Experience => Some(SectionKey::Experience),
            StepId::Education => Some(SectionKey::Education),
            StepId::Skills => Some(SectionKey::Skills),
            StepId::Projects => Some(SectionKey::Projects),
            StepId::Certifications => Some(SectionKey::Certifications),
            StepId::Languages => Some(SectionKey::Languages),
            StepId::Contact => Some(SectionKey::Contact),
            StepId::Family => Some(SectionKey::Family),
            StepId::Occupation => Some(SectionKey::Occupation),
            StepId::Lifestyle => Some(SectionKey::Lifestyle),
            StepId::PartnerPreference => Some(SectionKey::PartnerPreference),
            StepId::Horoscope => Some(SectionKey::Horoscope),
            StepId::Photos => Some(SectionKey::Photos),
            StepId::About => Some(SectionKey::About),
            StepId::Preview => None,
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const RESUME_GRAPH: &[StepId] = &[
    StepId::Personal,
    StepId::Summary,
    StepId::Experience,
    StepId::Education,
    StepId::Skills,
    StepId::Projects,
    StepId::Certifications,
    StepId::Languages,
    StepId::Preview,
];

const BIODATA_GRAPH: &[StepId] = &[
    StepId::Personal,
    StepId::Contact,
    StepId::Family,
    StepId::Education,
    StepId::Occupation,
    StepId::Lifestyle,
    StepId::PartnerPreference,
    StepId::Horoscope,
    StepId::Photos,
    StepId::About,
    StepId::Preview,
];

/// The ordered step list for one document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepGraph {
    steps: &'static [StepId],
}

impl StepGraph {
    pub fn for_kind(kind: DocumentKind) -> Self {
        let steps = match kind {
            DocumentKind::Resume => RESUME_GRAPH,
            DocumentKind::Biodata => BIODATA_GRAPH,
        };
        Self { steps }
    }

    pub fn steps(&self) -> &'static [StepId] {
        self.steps
    }

    pub fn first(&self) -> StepId {
        self.steps[0]
    }

    pub fn terminal(&self) -> StepId {
        self.steps[self.steps.len() - 1]
    }

    pub fn contains(&self, step: StepId) -> bool {
        self.steps.contains(&step)
    }

    fn position(&self, step: StepId) -> Option<usize> {
        self.steps.iter().position(|s| *s == step)
    }

    /// The step after `step`, or `None` at the terminal step or for a foreign step.
    pub fn next(&self, step: StepId) -> Option<StepId> {
        self.position(step)
            .and_then(|i| self.steps.get(i + 1))
            .copied()
    }

    /// The step before `step`, or `None` at the first step or for a foreign step.
    pub fn previous(&self, step: StepId) -> Option<StepId> {
        self.position(step)
            .and_then(|i| i.checked_sub(1))
            .map(|i| self.steps[i])
    }

    /// Steps that edit a section, i.e. everything except the terminal preview.
    pub fn section_steps(&self) -> impl Iterator<Item = (StepId, SectionKey)> + '_ {
        self.steps
            .iter()
            .filter_map(|step| step.section().map(|section| (*step, section)))
    }

    /// The step that edits `section` in this graph.
    pub fn step_for_section(&self, section: SectionKey) -> Option<StepId> {
        self.section_steps()
            .find(|(_, s)| *s == section)
            .map(|(step, _)| step)
    }
}
