//! Draft documents: a résumé or a marriage biodata, addressed section by section.
//!
//! The wire shape is `{"kind": "resume", "sections": {...}}`. Section payloads use
//! camelCase keys because they are written directly by the wizard's field-input layer.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Kinds and section keys
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    Biodata,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Resume => "resume",
            DocumentKind::Biodata => "biodata",
        }
    }

    /// Sections a draft of this kind carries, in wizard order.
    pub fn sections(&self) -> &'static [SectionKey] {
        match self {
            DocumentKind::Resume => RESUME_SECTIONS,
            DocumentKind::Biodata => BIODATA_SECTIONS,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKey {
    PersonalInfo,
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
}

impl SectionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::PersonalInfo => "personalInfo",
            SectionKey::Summary => "summary",
            SectionKey::Experience => "experience",
            SectionKey::Education => "education",
            SectionKey::Skills => "skills",
            SectionKey::Projects => "projects",
            SectionKey::Certifications => "certifications",
            SectionKey::Languages => "languages",
            SectionKey::Contact => "contact",
            SectionKey::Family => "family",
            SectionKey::Occupation => "occupation",
            SectionKey::Lifestyle => "lifestyle",
            SectionKey::PartnerPreference => "partnerPreference",
            SectionKey::Horoscope => "horoscope",
            SectionKey::Photos => "photos",
            SectionKey::About => "about",
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const RESUME_SECTIONS: &[SectionKey] = &[
    SectionKey::PersonalInfo,
    SectionKey::Summary,
    SectionKey::Experience,
    SectionKey::Education,
    SectionKey::Skills,
    SectionKey::Projects,
    SectionKey::Certifications,
    SectionKey::Languages,
];

const BIODATA_SECTIONS: &[SectionKey] = &[
    SectionKey::PersonalInfo,
    SectionKey::Contact,
    SectionKey::Family,
    SectionKey::Education,
    SectionKey::Occupation,
    SectionKey::Lifestyle,
    SectionKey::PartnerPreference,
    SectionKey::Horoscope,
    SectionKey::Photos,
    SectionKey::About,
];

// ────────────────────────────────────────────────────────────────────────────
// Résumé sections
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ResumePersonalInfo {
    pub full_name: String,
    pub job_title: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub linkedin: String,
    pub website: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Summary {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ExperienceEntry {
    pub company: String,
    pub position: String,
    pub location: String,
    /// `YYYY-MM` or `YYYY-MM-DD`.
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub description: String,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub start_date: String,
    pub end_date: String,
    pub grade: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SkillEntry {
    pub name: String,
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectEntry {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CertificationEntry {
    pub name: String,
    pub issuer: String,
    pub issue_date: String,
    pub credential_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LanguageEntry {
    pub name: String,
    pub proficiency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ResumeSections {
    pub personal_info: ResumePersonalInfo,
    pub summary: Summary,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<SkillEntry>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub languages: Vec<LanguageEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Biodata sections
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BiodataPersonalInfo {
    pub full_name: String,
    pub gender: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub time_of_birth: String,
    pub place_of_birth: String,
    pub height_cm: Option<u32>,
    pub complexion: String,
    pub marital_status: String,
    pub religion: String,
    pub caste: String,
    pub mother_tongue: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Contact {
    pub phone: String,
    pub email: String,
    pub address: String,
    pub contact_person: String,
    pub relation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Family {
    pub father_name: String,
    pub father_occupation: String,
    pub mother_name: String,
    pub mother_occupation: String,
    pub brothers: Option<u32>,
    pub married_brothers: Option<u32>,
    pub sisters: Option<u32>,
    pub married_sisters: Option<u32>,
    pub family_type: String,
    pub family_values: String,
    pub native_place: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BiodataEducation {
    pub highest_qualification: String,
    pub institution: String,
    pub additional_qualifications: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Occupation {
    pub occupation: String,
    pub employer: String,
    pub annual_income: String,
    pub work_location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Lifestyle {
    pub diet: String,
    pub smoking: String,
    pub drinking: String,
    pub hobbies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PartnerPreference {
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub height_min_cm: Option<u32>,
    pub height_max_cm: Option<u32>,
    pub education: String,
    pub occupation: String,
    pub location: String,
    pub expectations: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Horoscope {
    pub rashi: String,
    pub nakshatra: String,
    pub gotra: String,
    pub manglik: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PhotoEntry {
    /// Opaque reference produced by the upload collaborator (URL or object key).
    pub url: String,
    pub caption: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct About {
    pub about_me: String,
    pub about_family: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BiodataSections {
    pub personal_info: BiodataPersonalInfo,
    pub contact: Contact,
    pub family: Family,
    pub education: BiodataEducation,
    pub occupation: Occupation,
    pub lifestyle: Lifestyle,
    pub partner_preference: PartnerPreference,
    pub horoscope: Horoscope,
    pub photos: Vec<PhotoEntry>,
    pub about: About,
}

// ────────────────────────────────────────────────────────────────────────────
// Draft
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum SectionError {
    #[error("section '{section}' does not exist on a {kind} draft")]
    NotInKind { section: SectionKey, kind: DocumentKind },

    #[error("section '{section}' expects {expected}")]
    PatchType {
        section: SectionKey,
        expected: &'static str,
    },

    #[error("section '{section}' rejected the data: {message}")]
    Shape { section: SectionKey, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sections", rename_all = "snake_case")]
pub enum Draft {
    Resume(ResumeSections),
    Biodata(BiodataSections),
}

impl Draft {
    /// An empty draft of the given kind.
    pub fn new(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Resume => Draft::Resume(ResumeSections::default()),
            DocumentKind::Biodata => Draft::Biodata(BiodataSections::default()),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Draft::Resume(_) => DocumentKind::Resume,
            Draft::Biodata(_) => DocumentKind::Biodata,
        }
    }

    /// JSON view of one section, or `None` when the section is not part of this kind.
    pub fn section_value(&self, key: SectionKey) -> Option<Value> {
        if !self.kind().sections().contains(&key) {
            return None;
        }
        let mut sections = match self {
            Draft::Resume(s) => serde_json::to_value(s).ok()?,
            Draft::Biodata(s) => serde_json::to_value(s).ok()?,
        };
        sections
            .as_object_mut()
            .and_then(|obj| obj.remove(key.as_str()))
    }

    /// Whether a section still holds its empty default.
    pub fn section_is_empty(&self, key: SectionKey) -> bool {
        self.section_value(key).map_or(true, |v| is_blank(&v))
    }

    /// Returns a new draft with `patch` merged into `key`.
    ///
    /// Object sections are shallow-merged (a `null` resets that field); list sections
    /// are replaced wholesale by an array. `self` is never modified.
    pub fn with_section(&self, key: SectionKey, patch: &Value) -> Result<Draft, SectionError> {
        let kind = self.kind();
        if !kind.sections().contains(&key) {
            return Err(SectionError::NotInKind { section: key, kind });
        }

        let mut sections = match self {
            Draft::Resume(s) => to_object(s, key)?,
            Draft::Biodata(s) => to_object(s, key)?,
        };
        let current = sections
            .get_mut(key.as_str())
            .ok_or_else(|| SectionError::Shape {
                section: key,
                message: "section missing from serialized draft".to_string(),
            })?;
        merge_section(key, current, patch)?;

        let sections = Value::Object(sections);
        Ok(match kind {
            DocumentKind::Resume => Draft::Resume(from_object(sections, key)?),
            DocumentKind::Biodata => Draft::Biodata(from_object(sections, key)?),
        })
    }
}

fn to_object<T: Serialize>(sections: &T, key: SectionKey) -> Result<Map<String, Value>, SectionError> {
    match serde_json::to_value(sections) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SectionError::Shape {
            section: key,
            message: "draft sections did not serialize to an object".to_string(),
        }),
        Err(e) => Err(SectionError::Shape {
            section: key,
            message: e.to_string(),
        }),
    }
}

fn from_object<T: DeserializeOwned>(value: Value, key: SectionKey) -> Result<T, SectionError> {
    serde_json::from_value(value).map_err(|e| SectionError::Shape {
        section: key,
        message: e.to_string(),
    })
}

fn merge_section(key: SectionKey, current: &mut Value, patch: &Value) -> Result<(), SectionError> {
    let expected = if current.is_array() {
        "an array of entries"
    } else {
        "an object of fields"
    };

    match (current, patch) {
        (Value::Object(target), Value::Object(fields)) => {
            for (field, value) in fields {
                if value.is_null() {
                    target.remove(field);
                } else {
                    target.insert(field.clone(), value.clone());
                }
            }
            Ok(())
        }
        (Value::Array(entries), Value::Array(replacement)) => {
            *entries = replacement.clone();
            Ok(())
        }
        _ => Err(SectionError::PatchType {
            section: key,
            expected,
        }),
    }
}

/// True for values that carry no user data: null, empty/whitespace strings,
/// `false`, empty arrays, and objects whose members are all blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(_) => false,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.values().all(is_blank),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_draft_matches_kind() {
        assert_eq!(Draft::new(DocumentKind::Resume).kind(), DocumentKind::Resume);
        assert_eq!(Draft::new(DocumentKind::Biodata).kind(), DocumentKind::Biodata);
    }

    #[test]
    fn test_wire_shape_is_tagged() {
        let value = serde_json::to_value(Draft::new(DocumentKind::Resume)).unwrap();
        assert_eq!(value["kind"], "resume");
        assert!(value["sections"]["personalInfo"].is_object());
        assert!(value["sections"]["experience"].is_array());
    }

    #[test]
    fn test_with_section_merges_fields() {
        let draft = Draft::new(DocumentKind::Resume);
        let draft = draft
            .with_section(SectionKey::PersonalInfo, &json!({"fullName": "Ann Lee"}))
            .unwrap();
        let draft = draft
            .with_section(SectionKey::PersonalInfo, &json!({"email": "ann@x.com"}))
            .unwrap();

        let Draft::Resume(sections) = &draft else {
            panic!("expected a resume draft");
        };
        assert_eq!(sections.personal_info.full_name, "Ann Lee");
        assert_eq!(sections.personal_info.email, "ann@x.com");
    }

    #[test]
    fn test_with_section_null_resets_field() {
        let draft = Draft::new(DocumentKind::Biodata)
            .with_section(SectionKey::Family, &json!({"brothers": 2, "fatherName": "Ravi"}))
            .unwrap()
            .with_section(SectionKey::Family, &json!({"brothers": null}))
            .unwrap();
        let Draft::Biodata(sections) = &draft else {
            panic!("expected a biodata draft");
        };
        assert_eq!(sections.family.brothers, None);
        assert_eq!(sections.family.father_name, "Ravi");
    }

    #[test]
    fn test_with_section_replaces_lists() {
        let draft = Draft::new(DocumentKind::Resume)
            .with_section(
                SectionKey::Skills,
                &json!([{"name": "Rust", "level": "expert"}, {"name": "SQL"}]),
            )
            .unwrap()
            .with_section(SectionKey::Skills, &json!([{"name": "Go"}]))
            .unwrap();
        let Draft::Resume(sections) = &draft else {
            panic!("expected a resume draft");
        };
        assert_eq!(sections.skills.len(), 1);
        assert_eq!(sections.skills[0].name, "Go");
    }

    #[test]
    fn test_with_section_rejects_foreign_section() {
        let err = Draft::new(DocumentKind::Resume)
            .with_section(SectionKey::Horoscope, &json!({"rashi": "Mesha"}))
            .unwrap_err();
        assert!(matches!(err, SectionError::NotInKind { .. }));
    }

    #[test]
    fn test_with_section_rejects_wrong_shape() {
        let draft = Draft::new(DocumentKind::Resume);
        assert!(matches!(
            draft.with_section(SectionKey::Experience, &json!({"company": "Acme"})),
            Err(SectionError::PatchType { .. })
        ));
        assert!(matches!(
            draft.with_section(SectionKey::PersonalInfo, &json!({"unknownField": "x"})),
            Err(SectionError::Shape { .. })
        ));
        assert!(matches!(
            draft.with_section(SectionKey::PersonalInfo, &json!({"fullName": 42})),
            Err(SectionError::Shape { .. })
        ));
    }

    #[test]
    fn test_with_section_does_not_mutate_original() {
        let original = Draft::new(DocumentKind::Resume);
        let _ = original
            .with_section(SectionKey::Summary, &json!({"text": "Engineer"}))
            .unwrap();
        assert_eq!(original, Draft::new(DocumentKind::Resume));
    }

    #[test]
    fn test_section_value_and_emptiness() {
        let draft = Draft::new(DocumentKind::Biodata);
        assert!(draft.section_is_empty(SectionKey::About));
        assert!(draft.section_value(SectionKey::Skills).is_none());

        let draft = draft
            .with_section(SectionKey::About, &json!({"aboutMe": "Hello"}))
            .unwrap();
        assert!(!draft.section_is_empty(SectionKey::About));
        assert_eq!(
            draft.section_value(SectionKey::About).unwrap()["aboutMe"],
            "Hello"
        );
    }
}
