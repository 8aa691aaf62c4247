//! Template catalogue. Three interchangeable templates per document kind.
//!
//! A template decides colours, column layout, font sizes and how sections are
//! grouped onto pages. It never owns data: the selected template is a wizard
//! setting and switching it leaves the draft untouched.

use serde::{Deserialize, Serialize};

use crate::models::draft::{DocumentKind, SectionKey};
use crate::render::metrics::FontFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    Classic,
    Modern,
    Minimal,
    Traditional,
    Elegant,
    Royal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Layout {
    SingleColumn,
    /// Decorative side panel of the given width; content flows to its right.
    Sidebar { width_pt: f32 },
}

/// Sections rendered together, starting on a fresh page.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SectionGroup {
    pub name: &'static str,
    pub sections: &'static [SectionKey],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TemplateSpec {
    pub id: TemplateId,
    pub kind: DocumentKind,
    pub display_name: &'static str,
    pub layout: Layout,
    pub body_font: FontFamily,
    pub heading_font: FontFamily,
    pub name_size_pt: f32,
    pub heading_size_pt: f32,
    pub body_size_pt: f32,
    pub accent: [u8; 3],
    pub text_color: [u8; 3],
    /// Full-page background tint, if any.
    pub page_tint: Option<[u8; 3]>,
    pub groups: &'static [SectionGroup],
}

const RESUME_GROUPS: &[SectionGroup] = &[
    SectionGroup {
        name: "profile",
        sections: &[
            SectionKey::PersonalInfo,
            SectionKey::Summary,
            SectionKey::Experience,
        ],
    },
    SectionGroup {
        name: "background",
        sections: &[
            SectionKey::Education,
            SectionKey::Skills,
            SectionKey::Projects,
            SectionKey::Certifications,
            SectionKey::Languages,
        ],
    },
];

const RESUME_COMPACT_GROUPS: &[SectionGroup] = &[SectionGroup {
    name: "resume",
    sections: &[
        SectionKey::PersonalInfo,
        SectionKey::Summary,
        SectionKey::Experience,
        SectionKey::Education,
        SectionKey::Skills,
        SectionKey::Projects,
        SectionKey::Certifications,
        SectionKey::Languages,
    ],
}];

const BIODATA_GROUPS: &[SectionGroup] = &[
    SectionGroup {
        name: "introduction",
        sections: &[
            SectionKey::PersonalInfo,
            SectionKey::Education,
            SectionKey::Occupation,
            SectionKey::Horoscope,
            SectionKey::Contact,
        ],
    },
    SectionGroup {
        name: "family",
        sections: &[
            SectionKey::Family,
            SectionKey::Lifestyle,
            SectionKey::PartnerPreference,
            SectionKey::About,
        ],
    },
    SectionGroup {
        name: "photos",
        sections: &[SectionKey::Photos],
    },
];

const CATALOGUE: &[TemplateSpec] = &[
    TemplateSpec {
        id: TemplateId::Classic,
        kind: DocumentKind::Resume,
        display_name: "Classic",
        layout: Layout::SingleColumn,
        body_font: FontFamily::TimesRoman,
        heading_font: FontFamily::TimesBold,
        name_size_pt: 22.0,
        heading_size_pt: 13.0,
        body_size_pt: 10.5,
        accent: [33, 37, 41],
        text_color: [33, 37, 41],
        page_tint: None,
        groups: RESUME_GROUPS,
    },
    TemplateSpec {
        id: TemplateId::Modern,
        kind: DocumentKind::Resume,
        display_name: "Modern",
        layout: Layout::Sidebar { width_pt: 150.0 },
        body_font: FontFamily::Helvetica,
        heading_font: FontFamily::HelveticaBold,
        name_size_pt: 24.0,
        heading_size_pt: 12.0,
        body_size_pt: 10.0,
        accent: [37, 99, 235],
        text_color: [31, 41, 55],
        page_tint: None,
        groups: RESUME_GROUPS,
    },
    TemplateSpec {
        id: TemplateId::Minimal,
        kind: DocumentKind::Resume,
        display_name: "Minimal",
        layout: Layout::SingleColumn,
        body_font: FontFamily::Helvetica,
        heading_font: FontFamily::HelveticaBold,
        name_size_pt: 20.0,
        heading_size_pt: 11.0,
        body_size_pt: 9.5,
        accent: [107, 114, 128],
        text_color: [17, 24, 39],
        page_tint: None,
        groups: RESUME_COMPACT_GROUPS,
    },
    TemplateSpec {
        id: TemplateId::Traditional,
        kind: DocumentKind::Biodata,
        display_name: "Traditional",
        layout: Layout::SingleColumn,
        body_font: FontFamily::TimesRoman,
        heading_font: FontFamily::TimesBold,
        name_size_pt: 24.0,
        heading_size_pt: 14.0,
        body_size_pt: 11.0,
        accent: [185, 28, 28],
        text_color: [68, 20, 20],
        page_tint: Some([255, 248, 231]),
        groups: BIODATA_GROUPS,
    },
    TemplateSpec {
        id: TemplateId::Elegant,
        kind: DocumentKind::Biodata,
        display_name: "Elegant",
        layout: Layout::Sidebar { width_pt: 120.0 },
        body_font: FontFamily::Helvetica,
        heading_font: FontFamily::HelveticaBold,
        name_size_pt: 22.0,
        heading_size_pt: 13.0,
        body_size_pt: 10.5,
        accent: [124, 58, 237],
        text_color: [46, 16, 101],
        page_tint: Some([250, 245, 255]),
        groups: BIODATA_GROUPS,
    },
    TemplateSpec {
        id: TemplateId::Royal,
        kind: DocumentKind::Biodata,
        display_name: "Royal",
        layout: Layout::SingleColumn,
        body_font: FontFamily::TimesRoman,
        heading_font: FontFamily::TimesBold,
        name_size_pt: 26.0,
        heading_size_pt: 14.0,
        body_size_pt: 11.0,
        accent: [180, 130, 20],
        text_color: [30, 27, 75],
        page_tint: Some([254, 252, 232]),
        groups: BIODATA_GROUPS,
    },
];

impl TemplateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Classic => "classic",
            TemplateId::Modern => "modern",
            TemplateId::Minimal => "minimal",
            TemplateId::Traditional => "traditional",
            TemplateId::Elegant => "elegant",
            TemplateId::Royal => "royal",
        }
    }

    pub fn spec(&self) -> &'static TemplateSpec {
        CATALOGUE
            .iter()
            .find(|t| t.id == *self)
            .unwrap_or(&CATALOGUE[0])
    }

    pub fn kind(&self) -> DocumentKind {
        self.spec().kind
    }

    /// The template a fresh draft of `kind` starts with.
    pub fn default_for(kind: DocumentKind) -> TemplateId {
        match kind {
            DocumentKind::Resume => TemplateId::Classic,
            DocumentKind::Biodata => TemplateId::Traditional,
        }
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Templates available for a document kind, in catalogue order.
pub fn templates_for(kind: DocumentKind) -> Vec<&'static TemplateSpec> {
    CATALOGUE.iter().filter(|t| t.kind == kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_templates_per_kind() {
        assert_eq!(templates_for(DocumentKind::Resume).len(), 3);
        assert_eq!(templates_for(DocumentKind::Biodata).len(), 3);
    }

    #[test]
    fn test_spec_lookup_matches_id() {
        for spec in CATALOGUE {
            assert_eq!(spec.id.spec().id, spec.id);
        }
    }

    #[test]
    fn test_default_template_belongs_to_kind() {
        for kind in [DocumentKind::Resume, DocumentKind::Biodata] {
            assert_eq!(TemplateId::default_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_groups_cover_every_section_once() {
        for spec in CATALOGUE {
            let mut seen: Vec<SectionKey> = spec
                .groups
                .iter()
                .flat_map(|g| g.sections.iter().copied())
                .collect();
            seen.sort();
            let mut expected = spec.kind.sections().to_vec();
            expected.sort();
            assert_eq!(seen, expected, "{} groups mismatch", spec.id);
        }
    }
}
