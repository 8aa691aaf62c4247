//! Declarative per-step field rules.
//!
//! Every rule carries an explicit [`Severity`]. Only `Blocking` rules can veto
//! `NEXT_STEP`; `Advisory` rules are surfaced to the user and nothing more.
//! Checks other than `Required` and `MinItems` are skipped when the field is empty.

use serde::{Deserialize, Serialize};

use crate::models::draft::DocumentKind;
use crate::wizard::steps::StepId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocking,
    Advisory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Check {
    Required,
    MinLen(usize),
    MaxLen(usize),
    Email,
    Phone,
    Url,
    /// `YYYY-MM` or `YYYY-MM-DD`.
    Date,
    /// `HH:MM`, 24-hour clock.
    Time,
    Range { min: u64, max: u64 },
    OneOf(&'static [&'static str]),
    MinItems(usize),
    MaxItems(usize),
    /// Numeric field must not exceed the named sibling field.
    NotGreaterThan(&'static str),
    /// Date field must not precede the named sibling date field.
    NotBefore(&'static str),
}

impl Check {
    /// Presence checks contribute to form progress and apply to empty values.
    pub fn is_presence(&self) -> bool {
        matches!(self, Check::Required | Check::MinItems(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub check: Check,
    pub severity: Severity,
    pub message: &'static str,
}

/// Rules for one step. List sections put their list-level rules in `rules`
/// (keyed by the section name) and per-entry rules in `item_rules`.
#[derive(Debug, Clone, Copy)]
pub struct StepSchema {
    pub rules: &'static [FieldRule],
    pub item_rules: &'static [FieldRule],
}

const fn blocking(field: &'static str, check: Check, message: &'static str) -> FieldRule {
    FieldRule {
        field,
        check,
        severity: Severity::Blocking,
        message,
    }
}

const fn advisory(field: &'static str, check: Check, message: &'static str) -> FieldRule {
    FieldRule {
        field,
        check,
        severity: Severity::Advisory,
        message,
    }
}

const EMPTY: StepSchema = StepSchema {
    rules: &[],
    item_rules: &[],
};

pub const SKILL_LEVELS: &[&str] = &["beginner", "intermediate", "advanced", "expert"];
pub const LANGUAGE_LEVELS: &[&str] = &["basic", "conversational", "fluent", "native"];
pub const GENDERS: &[&str] = &["male", "female", "other"];
pub const MARITAL_STATUSES: &[&str] = &["never-married", "divorced", "widowed", "awaiting-divorce"];
pub const FAMILY_TYPES: &[&str] = &["joint", "nuclear", "extended"];
pub const DIETS: &[&str] = &["vegetarian", "non-vegetarian", "eggetarian", "vegan", "jain"];
pub const HABITS: &[&str] = &["no", "occasionally", "yes"];
pub const MANGLIK: &[&str] = &["yes", "no", "anshik", "unknown"];

// ────────────────────────────────────────────────────────────────────────────
// Résumé tables
// ────────────────────────────────────────────────────────────────────────────

const RESUME_PERSONAL: StepSchema = StepSchema {
    rules: &[
        blocking("fullName", Check::Required, "Full name is required"),
        blocking("fullName", Check::MinLen(2), "Full name must be at least 2 characters"),
        blocking("fullName", Check::MaxLen(100), "Full name must be at most 100 characters"),
        blocking("email", Check::Required, "Email is required"),
        blocking("email", Check::Email, "Enter a valid email address"),
        blocking("phone", Check::Required, "Phone number is required"),
        blocking("phone", Check::Phone, "Enter a valid phone number"),
        blocking("address", Check::Required, "Address is required"),
        blocking("address", Check::MaxLen(200), "Address must be at most 200 characters"),
        advisory("jobTitle", Check::Required, "A job title helps recruiters place you"),
        blocking("linkedin", Check::Url, "LinkedIn must be a valid URL"),
        blocking("website", Check::Url, "Website must be a valid URL"),
    ],
    item_rules: &[],
};

const RESUME_SUMMARY: StepSchema = StepSchema {
    rules: &[
        advisory("text", Check::Required, "A short summary makes the résumé stronger"),
        advisory("text", Check::MinLen(50), "Summaries under 50 characters read as thin"),
        blocking("text", Check::MaxLen(1000), "Summary must be at most 1000 characters"),
    ],
    item_rules: &[],
};

const RESUME_EXPERIENCE: StepSchema = StepSchema {
    rules: &[advisory(
        "experience",
        Check::MinItems(1),
        "Add at least one position, or skip if you are just starting out",
    )],
    item_rules: &[
        blocking("company", Check::Required, "Company is required"),
        blocking("position", Check::Required, "Position is required"),
        blocking("startDate", Check::Date, "Start date must look like YYYY-MM"),
        blocking("endDate", Check::Date, "End date must look like YYYY-MM"),
        blocking("endDate", Check::NotBefore("startDate"), "End date cannot be before start date"),
        blocking("description", Check::MaxLen(2000), "Description must be at most 2000 characters"),
        advisory("description", Check::Required, "Describe what you did in this role"),
        blocking("achievements", Check::MaxItems(10), "List at most 10 achievements"),
    ],
};

const RESUME_EDUCATION: StepSchema = StepSchema {
    rules: &[blocking(
        "education",
        Check::MinItems(1),
        "Add at least one education entry",
    )],
    item_rules: &[
        blocking("institution", Check::Required, "Institution is required"),
        blocking("degree", Check::Required, "Degree is required"),
        advisory("field", Check::Required, "Field of study helps readers"),
        blocking("startDate", Check::Date, "Start date must look like YYYY-MM"),
        blocking("endDate", Check::Date, "End date must look like YYYY-MM"),
        blocking("endDate", Check::NotBefore("startDate"), "End date cannot be before start date"),
    ],
};

const RESUME_SKILLS: StepSchema = StepSchema {
    rules: &[
        advisory("skills", Check::MinItems(3), "List at least three skills"),
        blocking("skills", Check::MaxItems(50), "List at most 50 skills"),
    ],
    item_rules: &[
        blocking("name", Check::Required, "Skill name is required"),
        blocking("name", Check::MaxLen(50), "Skill name must be at most 50 characters"),
        blocking("level", Check::OneOf(SKILL_LEVELS), "Pick a listed skill level"),
    ],
};

const RESUME_PROJECTS: StepSchema = StepSchema {
    rules: &[advisory("projects", Check::MinItems(1), "Projects show what you can build")],
    item_rules: &[
        blocking("name", Check::Required, "Project name is required"),
        advisory("description", Check::Required, "Describe the project"),
        blocking("description", Check::MaxLen(1000), "Description must be at most 1000 characters"),
        blocking("url", Check::Url, "Project URL must be a valid URL"),
    ],
};

const RESUME_CERTIFICATIONS: StepSchema = StepSchema {
    rules: &[],
    item_rules: &[
        blocking("name", Check::Required, "Certification name is required"),
        blocking("issuer", Check::Required, "Issuer is required"),
        blocking("issueDate", Check::Date, "Issue date must look like YYYY-MM"),
    ],
};

const RESUME_LANGUAGES: StepSchema = StepSchema {
    rules: &[],
    item_rules: &[
        blocking("name", Check::Required, "Language is required"),
        blocking("proficiency", Check::OneOf(LANGUAGE_LEVELS), "Pick a listed proficiency"),
    ],
};

// ────────────────────────────────────────────────────────────────────────────
// Biodata tables
// ────────────────────────────────────────────────────────────────────────────

const BIODATA_PERSONAL: StepSchema = StepSchema {
    rules: &[
        blocking("fullName", Check::Required, "Full name is required"),
        blocking("fullName", Check::MaxLen(100), "Full name must be at most 100 characters"),
        blocking("gender", Check::Required, "Gender is required"),
        blocking("gender", Check::OneOf(GENDERS), "Pick a listed gender"),
        blocking("dateOfBirth", Check::Required, "Date of birth is required"),
        blocking("dateOfBirth", Check::Date, "Date of birth must look like YYYY-MM-DD"),
        blocking("timeOfBirth", Check::Time, "Time of birth must look like HH:MM"),
        blocking("heightCm", Check::Range { min: 90, max: 250 }, "Height must be between 90 and 250 cm"),
        blocking("maritalStatus", Check::OneOf(MARITAL_STATUSES), "Pick a listed marital status"),
        advisory("religion", Check::Required, "Religion is commonly expected on a biodata"),
        advisory("motherTongue", Check::Required, "Mother tongue is commonly expected on a biodata"),
        advisory("placeOfBirth", Check::Required, "Place of birth is needed for horoscope matching"),
    ],
    item_rules: &[],
};

const BIODATA_CONTACT: StepSchema = StepSchema {
    rules: &[
        blocking("phone", Check::Required, "Contact phone is required"),
        blocking("phone", Check::Phone, "Enter a valid phone number"),
        blocking("email", Check::Email, "Enter a valid email address"),
        advisory("address", Check::Required, "An address helps families get in touch"),
        advisory("contactPerson", Check::Required, "Name the person to contact"),
    ],
    item_rules: &[],
};

const BIODATA_FAMILY: StepSchema = StepSchema {
    rules: &[
        blocking("fatherName", Check::Required, "Father's name is required"),
        blocking("motherName", Check::Required, "Mother's name is required"),
        blocking("brothers", Check::Range { min: 0, max: 20 }, "Brothers must be between 0 and 20"),
        blocking("sisters", Check::Range { min: 0, max: 20 }, "Sisters must be between 0 and 20"),
        blocking(
            "marriedBrothers",
            Check::NotGreaterThan("brothers"),
            "Married brothers cannot exceed total brothers",
        ),
        blocking(
            "marriedSisters",
            Check::NotGreaterThan("sisters"),
            "Married sisters cannot exceed total sisters",
        ),
        blocking("familyType", Check::OneOf(FAMILY_TYPES), "Pick a listed family type"),
        advisory("fatherOccupation", Check::Required, "Father's occupation is commonly expected"),
        advisory("nativePlace", Check::Required, "Native place is commonly expected"),
    ],
    item_rules: &[],
};

const BIODATA_EDUCATION: StepSchema = StepSchema {
    rules: &[
        blocking("highestQualification", Check::Required, "Highest qualification is required"),
        blocking(
            "highestQualification",
            Check::MaxLen(100),
            "Qualification must be at most 100 characters",
        ),
        advisory("institution", Check::Required, "Institution adds credibility"),
    ],
    item_rules: &[],
};

const BIODATA_OCCUPATION: StepSchema = StepSchema {
    rules: &[
        blocking("occupation", Check::Required, "Occupation is required"),
        advisory("annualIncome", Check::Required, "Annual income is commonly expected"),
        advisory("workLocation", Check::Required, "Work location is commonly expected"),
    ],
    item_rules: &[],
};

const BIODATA_LIFESTYLE: StepSchema = StepSchema {
    rules: &[
        blocking("diet", Check::OneOf(DIETS), "Pick a listed diet"),
        blocking("smoking", Check::OneOf(HABITS), "Pick a listed option"),
        blocking("drinking", Check::OneOf(HABITS), "Pick a listed option"),
        blocking("hobbies", Check::MaxItems(15), "List at most 15 hobbies"),
        advisory("diet", Check::Required, "Diet preference is commonly expected"),
    ],
    item_rules: &[],
};

const BIODATA_PARTNER_PREFERENCE: StepSchema = StepSchema {
    rules: &[
        blocking("ageMin", Check::Range { min: 18, max: 80 }, "Minimum age must be between 18 and 80"),
        blocking("ageMax", Check::Range { min: 18, max: 80 }, "Maximum age must be between 18 and 80"),
        blocking("ageMin", Check::NotGreaterThan("ageMax"), "Minimum age cannot exceed maximum age"),
        blocking(
            "heightMinCm",
            Check::Range { min: 90, max: 250 },
            "Minimum height must be between 90 and 250 cm",
        ),
        blocking(
            "heightMaxCm",
            Check::Range { min: 90, max: 250 },
            "Maximum height must be between 90 and 250 cm",
        ),
        blocking(
            "heightMinCm",
            Check::NotGreaterThan("heightMaxCm"),
            "Minimum height cannot exceed maximum height",
        ),
        blocking("expectations", Check::MaxLen(1000), "Expectations must be at most 1000 characters"),
        advisory("ageMin", Check::Required, "An age range helps families shortlist"),
        advisory("ageMax", Check::Required, "An age range helps families shortlist"),
    ],
    item_rules: &[],
};

const BIODATA_HOROSCOPE: StepSchema = StepSchema {
    rules: &[
        blocking("manglik", Check::OneOf(MANGLIK), "Pick a listed manglik status"),
        advisory("rashi", Check::Required, "Rashi is used for matching"),
        advisory("nakshatra", Check::Required, "Nakshatra is used for matching"),
        advisory("gotra", Check::Required, "Gotra is commonly expected"),
    ],
    item_rules: &[],
};

const BIODATA_PHOTOS: StepSchema = StepSchema {
    rules: &[
        advisory("photos", Check::MinItems(1), "Biodatas with a photo get more responses"),
        blocking("photos", Check::MaxItems(5), "Upload at most 5 photos"),
    ],
    item_rules: &[
        blocking("url", Check::Required, "Photo reference is missing"),
        blocking("caption", Check::MaxLen(80), "Caption must be at most 80 characters"),
    ],
};

const BIODATA_ABOUT: StepSchema = StepSchema {
    rules: &[
        advisory("aboutMe", Check::Required, "A few lines about yourself go a long way"),
        advisory("aboutMe", Check::MinLen(50), "Write at least 50 characters about yourself"),
        blocking("aboutMe", Check::MaxLen(1000), "About me must be at most 1000 characters"),
        blocking("aboutFamily", Check::MaxLen(1000), "About family must be at most 1000 characters"),
    ],
    item_rules: &[],
};

/// Looks up the rule table for a step of the given kind.
///
/// Steps outside the kind's graph and the terminal preview have no rules.
pub fn schema_for(kind: DocumentKind, step: StepId) -> StepSchema {
    match (kind, step) {
        (DocumentKind::Resume, StepId::Personal) => RESUME_PERSONAL,
        (DocumentKind::Resume, StepId::Summary) => RESUME_SUMMARY,
        (DocumentKind::Resume, StepId::Experience) => RESUME_EXPERIENCE,
        (DocumentKind::Resume, StepId::Education) => RESUME_EDUCATION,
        (DocumentKind::Resume, StepId::Skills) => RESUME_SKILLS,
        (DocumentKind::Resume, StepId::Projects) => RESUME_PROJECTS,
        (DocumentKind::Resume, StepId::Certifications) => RESUME_CERTIFICATIONS,
        (DocumentKind::Resume, StepId::Languages) => RESUME_LANGUAGES,
        (DocumentKind::Biodata, StepId::Personal) => BIODATA_PERSONAL,
        (DocumentKind::Biodata, StepId::Contact) => BIODATA_CONTACT,
        (DocumentKind::Biodata, StepId::Family) => BIODATA_FAMILY,
        (DocumentKind::Biodata, StepId::Education) => BIODATA_EDUCATION,
        (DocumentKind::Biodata, StepId::Occupation) => BIODATA_OCCUPATION,
        (DocumentKind::Biodata, StepId::Lifestyle) => BIODATA_LIFESTYLE,
        (DocumentKind::Biodata, StepId::PartnerPreference) => BIODATA_PARTNER_PREFERENCE,
        (DocumentKind::Biodata, StepId::Horoscope) => BIODATA_HOROSCOPE,
        (DocumentKind::Biodata, StepId::Photos) => BIODATA_PHOTOS,
        (DocumentKind::Biodata, StepId::About) => BIODATA_ABOUT,
        _ => EMPTY,
    }
}
