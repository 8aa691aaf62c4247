//! Validation Gate: evaluates a step's rule table against the draft.
//!
//! Validation failures are data, not errors: the result splits blocking errors
//! from advisories and only blocking errors make a step invalid.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::draft::{is_blank, Draft};
use crate::wizard::schema::{schema_for, Check, FieldRule, Severity};
use crate::wizard::steps::{StepGraph, StepId};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9\s\-()]{5,18}[0-9]$").expect("valid phone regex"));
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+(:[0-9]+)?(/\S*)?$")
        .expect("valid url regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// False only when at least one blocking error exists.
    pub is_valid: bool,
    /// Blocking errors keyed by field path (`email`, `experience[0].company`).
    pub errors: BTreeMap<String, String>,
    /// Advisory messages keyed by field path. Never block navigation.
    pub advisories: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: BTreeMap::new(),
            advisories: BTreeMap::new(),
        }
    }

    fn record(&mut self, path: String, rule: &FieldRule) {
        let bucket = match rule.severity {
            Severity::Blocking => &mut self.errors,
            Severity::Advisory => &mut self.advisories,
        };
        bucket.entry(path).or_insert_with(|| rule.message.to_string());
    }
}

/// The JSON scope rules are evaluated against for one step.
///
/// List sections are wrapped as `{"<section>": [...]}` so list-level rules can
/// address the list by the section name.
pub(crate) struct StepScope {
    pub section: &'static str,
    pub value: Value,
    pub is_list: bool,
}

impl StepScope {
    pub(crate) fn for_step(step: StepId, draft: &Draft) -> Option<Self> {
        let section = step.section()?;
        let value = draft.section_value(section)?;
        let is_list = value.is_array();
        let value = if is_list {
            let mut wrapped = Map::new();
            wrapped.insert(section.as_str().to_string(), value);
            Value::Object(wrapped)
        } else {
            value
        };
        Some(Self {
            section: section.as_str(),
            value,
            is_list,
        })
    }

    pub(crate) fn items(&self) -> &[Value] {
        if !self.is_list {
            return &[];
        }
        self.value
            .get(self.section)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Validates one step of the draft.
///
/// Steps without a section (preview) or outside the draft's graph are always valid.
pub fn validate_step(step: StepId, draft: &Draft) -> ValidationResult {
    let mut result = ValidationResult::valid();
    let Some(scope) = StepScope::for_step(step, draft) else {
        return result;
    };
    let schema = schema_for(draft.kind(), step);

    for rule in schema.rules {
        if !rule_passes(&scope.value, rule) {
            result.record(rule.field.to_string(), rule);
        }
    }

    for (index, item) in scope.items().iter().enumerate() {
        for rule in schema.item_rules {
            if !rule_passes(item, rule) {
                result.record(format!("{}[{}].{}", scope.section, index, rule.field), rule);
            }
        }
    }

    result.is_valid = result.errors.is_empty();
    result
}

/// Validates every step of the draft's graph.
pub fn validate_all(draft: &Draft) -> BTreeMap<StepId, ValidationResult> {
    StepGraph::for_kind(draft.kind())
        .section_steps()
        .map(|(step, _)| (step, validate_step(step, draft)))
        .collect()
}

/// Evaluates one rule against a JSON object scope.
pub(crate) fn rule_passes(scope: &Value, rule: &FieldRule) -> bool {
    let value = scope.get(rule.field).unwrap_or(&Value::Null);
    if !rule.check.is_presence() && is_blank(value) {
        return true;
    }

    match rule.check {
        Check::Required => !is_blank(value),
        Check::MinLen(min) => text(value).map_or(true, |s| s.trim().chars().count() >= min),
        Check::MaxLen(max) => text(value).map_or(true, |s| s.trim().chars().count() <= max),
        Check::Email => text(value).map_or(false, |s| EMAIL_RE.is_match(s.trim())),
        Check::Phone => text(value).map_or(false, |s| PHONE_RE.is_match(s.trim())),
        Check::Url => text(value).map_or(false, |s| URL_RE.is_match(s.trim())),
        Check::Date => text(value).and_then(parse_date).is_some(),
        Check::Time => text(value)
            .map_or(false, |s| NaiveTime::parse_from_str(s.trim(), "%H:%M").is_ok()),
        Check::Range { min, max } => value.as_u64().map_or(false, |n| n >= min && n <= max),
        Check::OneOf(options) => text(value).map_or(false, |s| options.contains(&s.trim())),
        Check::MinItems(min) => value.as_array().map_or(min == 0, |items| items.len() >= min),
        Check::MaxItems(max) => value.as_array().map_or(true, |items| items.len() <= max),
        Check::NotGreaterThan(other) => {
            match (value.as_u64(), scope.get(other).and_then(Value::as_u64)) {
                (Some(this), Some(limit)) => this <= limit,
                _ => true,
            }
        }
        Check::NotBefore(other) => {
            let this = text(value).and_then(parse_date);
            let earlier = scope.get(other).and_then(Value::as_str).and_then(parse_date);
            match (this, earlier) {
                (Some(this), Some(earlier)) => this >= earlier,
                _ => true,
            }
        }
    }
}

fn text(value: &Value) -> Option<&str> {
    value.as_str()
}

/// Accepts `YYYY-MM-DD` or `YYYY-MM` (treated as the first of the month).
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::draft::{DocumentKind, SectionKey};
    use serde_json::json;

    fn resume_with(section: SectionKey, data: Value) -> Draft {
        Draft::new(DocumentKind::Resume)
            .with_section(section, &data)
            .unwrap()
    }

    fn biodata_with(section: SectionKey, data: Value) -> Draft {
        Draft::new(DocumentKind::Biodata)
            .with_section(section, &data)
            .unwrap()
    }

    #[test]
    fn test_missing_phone_and_address_block() {
        let draft = resume_with(
            SectionKey::PersonalInfo,
            json!({"fullName": "Ann Lee", "email": "ann@x.com"}),
        );
        let result = validate_step(StepId::Personal, &draft);
        assert!(!result.is_valid);
        assert!(result.errors.contains_key("phone"));
        assert!(result.errors.contains_key("address"));
        assert!(!result.errors.contains_key("fullName"));
        assert!(result.advisories.contains_key("jobTitle"));
    }

    #[test]
    fn test_complete_personal_info_is_valid() {
        let draft = resume_with(
            SectionKey::PersonalInfo,
            json!({
                "fullName": "Ann Lee",
                "email": "ann@x.com",
                "phone": "+1 555 123 4567",
                "address": "1 Main St, Springfield"
            }),
        );
        let result = validate_step(StepId::Personal, &draft);
        assert!(result.is_valid, "errors: {:?}", result.errors);
        assert!(!result.advisories.is_empty(), "jobTitle is still advisory");
    }

    #[test]
    fn test_invalid_email_and_url() {
        let draft = resume_with(
            SectionKey::PersonalInfo,
            json!({"email": "not-an-email", "website": "no spaces allowed.com x"}),
        );
        let result = validate_step(StepId::Personal, &draft);
        assert_eq!(result.errors["email"], "Enter a valid email address");
        assert!(result.errors.contains_key("website"));
    }

    #[test]
    fn test_optional_fields_skip_format_checks_when_empty() {
        let draft = resume_with(SectionKey::PersonalInfo, json!({"linkedin": ""}));
        let result = validate_step(StepId::Personal, &draft);
        assert!(!result.errors.contains_key("linkedin"));
    }

    #[test]
    fn test_summary_is_advisory_only() {
        let draft = Draft::new(DocumentKind::Resume);
        let result = validate_step(StepId::Summary, &draft);
        assert!(result.is_valid);
        assert!(result.advisories.contains_key("text"));
    }

    #[test]
    fn test_experience_item_errors_are_indexed() {
        let draft = resume_with(
            SectionKey::Experience,
            json!([
                {"company": "Acme", "position": "Engineer", "startDate": "2020-01", "endDate": "2022-06"},
                {"company": "", "position": "Lead", "startDate": "2023-05", "endDate": "2021-01"}
            ]),
        );
        let result = validate_step(StepId::Experience, &draft);
        assert!(!result.is_valid);
        assert!(result.errors.contains_key("experience[1].company"));
        assert_eq!(
            result.errors["experience[1].endDate"],
            "End date cannot be before start date"
        );
        assert!(!result.errors.keys().any(|k| k.starts_with("experience[0]")));
    }

    #[test]
    fn test_empty_experience_is_advisory() {
        let result = validate_step(StepId::Experience, &Draft::new(DocumentKind::Resume));
        assert!(result.is_valid);
        assert!(result.advisories.contains_key("experience"));
    }

    #[test]
    fn test_empty_education_blocks() {
        let result = validate_step(StepId::Education, &Draft::new(DocumentKind::Resume));
        assert!(!result.is_valid);
        assert!(result.errors.contains_key("education"));
    }

    #[test]
    fn test_skill_level_enumeration() {
        let draft = resume_with(
            SectionKey::Skills,
            json!([{"name": "Rust", "level": "guru"}, {"name": "SQL", "level": "advanced"}]),
        );
        let result = validate_step(StepId::Skills, &draft);
        assert!(result.errors.contains_key("skills[0].level"));
        assert!(!result.errors.contains_key("skills[1].level"));
    }

    #[test]
    fn test_married_brothers_cannot_exceed_brothers() {
        let draft = biodata_with(
            SectionKey::Family,
            json!({"fatherName": "Ravi", "motherName": "Sita", "brothers": 1, "marriedBrothers": 2}),
        );
        let result = validate_step(StepId::Family, &draft);
        assert!(!result.is_valid);
        assert_eq!(
            result.errors["marriedBrothers"],
            "Married brothers cannot exceed total brothers"
        );
    }

    #[test]
    fn test_married_sisters_within_total_is_valid() {
        let draft = biodata_with(
            SectionKey::Family,
            json!({"fatherName": "Ravi", "motherName": "Sita", "sisters": 2, "marriedSisters": 2}),
        );
        let result = validate_step(StepId::Family, &draft);
        assert!(result.is_valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn test_partner_age_range_cross_field() {
        let draft = biodata_with(
            SectionKey::PartnerPreference,
            json!({"ageMin": 35, "ageMax": 28}),
        );
        let result = validate_step(StepId::PartnerPreference, &draft);
        assert!(result.errors.contains_key("ageMin"));

        let draft = biodata_with(
            SectionKey::PartnerPreference,
            json!({"ageMin": 12, "ageMax": 28}),
        );
        let result = validate_step(StepId::PartnerPreference, &draft);
        assert_eq!(result.errors["ageMin"], "Minimum age must be between 18 and 80");
    }

    #[test]
    fn test_biodata_personal_date_and_time_formats() {
        let draft = biodata_with(
            SectionKey::PersonalInfo,
            json!({
                "fullName": "Priya",
                "gender": "female",
                "dateOfBirth": "1995-13-40",
                "timeOfBirth": "25:99",
                "heightCm": 300
            }),
        );
        let result = validate_step(StepId::Personal, &draft);
        assert!(result.errors.contains_key("dateOfBirth"));
        assert!(result.errors.contains_key("timeOfBirth"));
        assert!(result.errors.contains_key("heightCm"));
    }

    #[test]
    fn test_horoscope_never_blocks_when_empty() {
        let result = validate_step(StepId::Horoscope, &Draft::new(DocumentKind::Biodata));
        assert!(result.is_valid);
        assert_eq!(result.advisories.len(), 3);
    }

    #[test]
    fn test_too_many_photos_block() {
        let photos: Vec<Value> = (0..6).map(|i| json!({"url": format!("p{i}.jpg")})).collect();
        let draft = biodata_with(SectionKey::Photos, Value::Array(photos));
        let result = validate_step(StepId::Photos, &draft);
        assert_eq!(result.errors["photos"], "Upload at most 5 photos");
    }

    #[test]
    fn test_preview_and_foreign_steps_are_valid() {
        let draft = Draft::new(DocumentKind::Resume);
        assert!(validate_step(StepId::Preview, &draft).is_valid);
        assert!(validate_step(StepId::Family, &draft).is_valid);
    }

    #[test]
    fn test_validate_all_covers_section_steps() {
        let all = validate_all(&Draft::new(DocumentKind::Biodata));
        assert_eq!(all.len(), 10);
        assert!(!all[&StepId::Personal].is_valid);
        assert!(all[&StepId::Horoscope].is_valid);
    }
}
