//! Template Renderer: binds a Draft to a template and lays it out as a
//! paginated RenderSurface.
//!
//! `render` is pure: it reads the draft, never mutates it, and produces the same
//! surface for the same input. Each section group of the template starts on a
//! fresh page; a group that overflows continues on further pages tagged with the
//! same group name. Empty sections are skipped, and a group whose sections are
//! all empty produces no page at all.

pub mod metrics;
pub mod surface;
pub mod templates;

use thiserror::Error;

use crate::models::draft::{
    BiodataSections, DocumentKind, Draft, ResumeSections, SectionKey,
};
use metrics::{get_metrics, line_height, FontFamily};
pub use surface::{Block, BlockKind, PageSize, Rect, RenderSurface, SurfacePage};
pub use templates::{templates_for, Layout, TemplateId, TemplateSpec};

const MARGIN: f32 = 48.0;
const SECTION_GAP: f32 = 14.0;
const ENTRY_GAP: f32 = 5.0;
const BULLET_INDENT: f32 = 10.0;
const PHOTO_WIDTH: f32 = 150.0;
const PHOTO_HEIGHT: f32 = 190.0;
const PHOTO_GAP: f32 = 16.0;

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("template '{template}' renders {template_kind} documents, not {draft_kind}")]
    KindMismatch {
        template: TemplateId,
        template_kind: DocumentKind,
        draft_kind: DocumentKind,
    },
}

/// Lays out `draft` with `template`.
pub fn render(draft: &Draft, template: TemplateId) -> Result<RenderSurface, RenderError> {
    let spec = template.spec();
    if spec.kind != draft.kind() {
        return Err(RenderError::KindMismatch {
            template,
            template_kind: spec.kind,
            draft_kind: draft.kind(),
        });
    }

    let mut writer = PageWriter::new(spec, PageSize::A4);

    for group in spec.groups {
        let contents: Vec<SectionContent> = group
            .sections
            .iter()
            .filter(|key| !draft.section_is_empty(**key))
            .filter_map(|key| section_content(draft, *key))
            .filter(|content| !content.lines.is_empty())
            .collect();
        if contents.is_empty() {
            continue;
        }

        writer.start_page(group.name);
        for content in contents {
            writer.section(content);
        }
    }

    Ok(RenderSurface {
        kind: spec.kind,
        template,
        page_size: writer.size,
        pages: writer.pages,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Section content
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// Document owner's name, large, in the accent colour.
    Title(String),
    Subtitle(String),
    Strong(String),
    Plain(String),
    Field(&'static str, String),
    Bullet(String),
    Photo { reference: String, caption: String },
}

#[derive(Debug)]
struct SectionContent {
    heading: Option<&'static str>,
    lines: Vec<Line>,
}

fn section_content(draft: &Draft, key: SectionKey) -> Option<SectionContent> {
    match draft {
        Draft::Resume(sections) => resume_section(sections, key),
        Draft::Biodata(sections) => biodata_section(sections, key),
    }
}

fn resume_section(s: &ResumeSections, key: SectionKey) -> Option<SectionContent> {
    let mut lines = Vec::new();
    let heading = match key {
        SectionKey::PersonalInfo => {
            let p = &s.personal_info;
            push_if(&mut lines, Line::Title, &p.full_name);
            push_if(&mut lines, Line::Subtitle, &p.job_title);
            let contact = join_nonempty(
                &[&p.email, &p.phone, &p.address, &p.linkedin, &p.website],
                " | ",
            );
            push_if(&mut lines, Line::Plain, &contact);
            None
        }
        SectionKey::Summary => {
            push_if(&mut lines, Line::Plain, &s.summary.text);
            Some("Summary")
        }
        SectionKey::Experience => {
            for e in &s.experience {
                let title = join_nonempty(&[&e.position, &e.company], ", ");
                push_if(&mut lines, Line::Strong, &title);
                let when = date_range(&e.start_date, &e.end_date, e.current);
                push_if(&mut lines, Line::Plain, &join_nonempty(&[&when, &e.location], " | "));
                push_if(&mut lines, Line::Plain, &e.description);
                for achievement in &e.achievements {
                    push_if(&mut lines, Line::Bullet, achievement);
                }
            }
            Some("Experience")
        }
        SectionKey::Education => {
            for e in &s.education {
                push_if(&mut lines, Line::Strong, &join_nonempty(&[&e.degree, &e.field], " in "));
                let when = date_range(&e.start_date, &e.end_date, false);
                push_if(&mut lines, Line::Plain, &join_nonempty(&[&e.institution, &when], " | "));
                if !e.grade.trim().is_empty() {
                    lines.push(Line::Field("Grade", e.grade.clone()));
                }
            }
            Some("Education")
        }
        SectionKey::Skills => {
            let skills: Vec<String> = s
                .skills
                .iter()
                .filter(|k| !k.name.trim().is_empty())
                .map(|k| with_qualifier(&k.name, &k.level))
                .collect();
            push_if(&mut lines, Line::Plain, &skills.join(", "));
            Some("Skills")
        }
        SectionKey::Projects => {
            for p in &s.projects {
                push_if(&mut lines, Line::Strong, &p.name);
                push_if(&mut lines, Line::Plain, &p.description);
                if !p.technologies.is_empty() {
                    lines.push(Line::Field("Technologies", p.technologies.join(", ")));
                }
                push_if(&mut lines, Line::Plain, &p.url);
            }
            Some("Projects")
        }
        SectionKey::Certifications => {
            for c in &s.certifications {
                push_if(&mut lines, Line::Strong, &c.name);
                push_if(
                    &mut lines,
                    Line::Plain,
                    &join_nonempty(&[&c.issuer, &c.issue_date, &c.credential_id], " | "),
                );
            }
            Some("Certifications")
        }
        SectionKey::Languages => {
            let languages: Vec<String> = s
                .languages
                .iter()
                .filter(|l| !l.name.trim().is_empty())
                .map(|l| with_qualifier(&l.name, &l.proficiency))
                .collect();
            push_if(&mut lines, Line::Plain, &languages.join(", "));
            Some("Languages")
        }
        _ => return None,
    };
    Some(SectionContent { heading, lines })
}

fn biodata_section(s: &BiodataSections, key: SectionKey) -> Option<SectionContent> {
    let mut lines = Vec::new();
    let heading = match key {
        SectionKey::PersonalInfo => {
            let p = &s.personal_info;
            push_if(&mut lines, Line::Title, &p.full_name);
            lines.push(Line::Subtitle("Marriage Biodata".to_string()));
            field(&mut lines, "Gender", &p.gender);
            field(&mut lines, "Date of birth", &p.date_of_birth);
            field(&mut lines, "Time of birth", &p.time_of_birth);
            field(&mut lines, "Place of birth", &p.place_of_birth);
            if let Some(cm) = p.height_cm {
                lines.push(Line::Field("Height", format!("{cm} cm")));
            }
            field(&mut lines, "Complexion", &p.complexion);
            field(&mut lines, "Marital status", &p.marital_status);
            field(&mut lines, "Religion", &p.religion);
            field(&mut lines, "Caste", &p.caste);
            field(&mut lines, "Mother tongue", &p.mother_tongue);
            None
        }
        SectionKey::Contact => {
            let c = &s.contact;
            field(&mut lines, "Contact person", &with_qualifier(&c.contact_person, &c.relation));
            field(&mut lines, "Phone", &c.phone);
            field(&mut lines, "Email", &c.email);
            field(&mut lines, "Address", &c.address);
            Some("Contact Details")
        }
        SectionKey::Family => {
            let f = &s.family;
            field(&mut lines, "Father", &with_qualifier(&f.father_name, &f.father_occupation));
            field(&mut lines, "Mother", &with_qualifier(&f.mother_name, &f.mother_occupation));
            sibling_field(&mut lines, "Brothers", f.brothers, f.married_brothers);
            sibling_field(&mut lines, "Sisters", f.sisters, f.married_sisters);
            field(&mut lines, "Family type", &f.family_type);
            field(&mut lines, "Family values", &f.family_values);
            field(&mut lines, "Native place", &f.native_place);
            Some("Family Details")
        }
        SectionKey::Education => {
            let e = &s.education;
            field(&mut lines, "Qualification", &e.highest_qualification);
            field(&mut lines, "Institution", &e.institution);
            field(&mut lines, "Additional", &e.additional_qualifications);
            Some("Education")
        }
        SectionKey::Occupation => {
            let o = &s.occupation;
            field(&mut lines, "Occupation", &o.occupation);
            field(&mut lines, "Employer", &o.employer);
            field(&mut lines, "Annual income", &o.annual_income);
            field(&mut lines, "Work location", &o.work_location);
            Some("Occupation")
        }
        SectionKey::Lifestyle => {
            let l = &s.lifestyle;
            field(&mut lines, "Diet", &l.diet);
            field(&mut lines, "Smoking", &l.smoking);
            field(&mut lines, "Drinking", &l.drinking);
            field(&mut lines, "Hobbies", &l.hobbies.join(", "));
            Some("Lifestyle")
        }
        SectionKey::PartnerPreference => {
            let p = &s.partner_preference;
            field(&mut lines, "Age", &bounded_range(p.age_min, p.age_max, "years"));
            field(&mut lines, "Height", &bounded_range(p.height_min_cm, p.height_max_cm, "cm"));
            field(&mut lines, "Education", &p.education);
            field(&mut lines, "Occupation", &p.occupation);
            field(&mut lines, "Location", &p.location);
            push_if(&mut lines, Line::Plain, &p.expectations);
            Some("Partner Preference")
        }
        SectionKey::Horoscope => {
            let h = &s.horoscope;
            field(&mut lines, "Rashi", &h.rashi);
            field(&mut lines, "Nakshatra", &h.nakshatra);
            field(&mut lines, "Gotra", &h.gotra);
            field(&mut lines, "Manglik", &h.manglik);
            Some("Horoscope")
        }
        SectionKey::Photos => {
            for photo in s.photos.iter().filter(|p| !p.url.trim().is_empty()) {
                lines.push(Line::Photo {
                    reference: photo.url.clone(),
                    caption: photo.caption.clone(),
                });
            }
            Some("Photographs")
        }
        SectionKey::About => {
            if !s.about.about_me.trim().is_empty() {
                lines.push(Line::Strong("About me".to_string()));
                lines.push(Line::Plain(s.about.about_me.clone()));
            }
            if !s.about.about_family.trim().is_empty() {
                lines.push(Line::Strong("About the family".to_string()));
                lines.push(Line::Plain(s.about.about_family.clone()));
            }
            Some("About")
        }
        _ => return None,
    };
    Some(SectionContent { heading, lines })
}

fn push_if(lines: &mut Vec<Line>, make: fn(String) -> Line, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        lines.push(make(value.to_string()));
    }
}

fn field(lines: &mut Vec<Line>, label: &'static str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        lines.push(Line::Field(label, value.to_string()));
    }
}

fn sibling_field(lines: &mut Vec<Line>, label: &'static str, total: Option<u32>, married: Option<u32>) {
    match (total, married) {
        (Some(total), Some(married)) => {
            lines.push(Line::Field(label, format!("{total} ({married} married)")))
        }
        (Some(total), None) => lines.push(Line::Field(label, total.to_string())),
        _ => {}
    }
}

fn join_nonempty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// `name (qualifier)`, or just `name` when the qualifier is blank.
fn with_qualifier(name: &str, qualifier: &str) -> String {
    let (name, qualifier) = (name.trim(), qualifier.trim());
    if name.is_empty() || qualifier.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({qualifier})")
    }
}

fn date_range(start: &str, end: &str, current: bool) -> String {
    let end = if current { "Present" } else { end.trim() };
    join_nonempty(&[start, end], " - ")
}

fn bounded_range(min: Option<u32>, max: Option<u32>, unit: &str) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("{lo} - {hi} {unit}"),
        (Some(lo), None) => format!("from {lo} {unit}"),
        (None, Some(hi)) => format!("up to {hi} {unit}"),
        (None, None) => String::new(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Page layout
// ────────────────────────────────────────────────────────────────────────────

struct PageWriter {
    spec: &'static TemplateSpec,
    size: PageSize,
    pages: Vec<SurfacePage>,
    cursor_y: f32,
    left: f32,
    width: f32,
}

impl PageWriter {
    fn new(spec: &'static TemplateSpec, size: PageSize) -> Self {
        let left = match spec.layout {
            Layout::SingleColumn => MARGIN,
            Layout::Sidebar { width_pt } => width_pt + MARGIN * 0.75,
        };
        Self {
            spec,
            size,
            pages: Vec::new(),
            cursor_y: MARGIN,
            left,
            width: size.width_pt - left - MARGIN,
        }
    }

    fn start_page(&mut self, group: &'static str) {
        let mut blocks = Vec::new();
        let full = Rect {
            x: 0.0,
            y: 0.0,
            width: self.size.width_pt,
            height: self.size.height_pt,
        };
        if let Some(tint) = self.spec.page_tint {
            blocks.push(self.panel(full, tint));
        }
        if let Layout::Sidebar { width_pt } = self.spec.layout {
            blocks.push(self.panel(Rect { width: width_pt, ..full }, self.spec.accent));
        }
        self.pages.push(SurfacePage {
            index: self.pages.len(),
            group,
            blocks,
        });
        self.cursor_y = MARGIN;
    }

    fn panel(&self, rect: Rect, color: [u8; 3]) -> Block {
        Block {
            kind: BlockKind::Panel,
            rect,
            text: None,
            font: self.spec.body_font,
            size_pt: 0.0,
            color,
        }
    }

    fn at_page_top(&self) -> bool {
        self.cursor_y <= MARGIN
    }

    /// Starts a continuation page when `height` no longer fits.
    fn ensure(&mut self, height: f32) {
        let bottom = self.size.height_pt - MARGIN;
        if self.cursor_y + height > bottom && !self.at_page_top() {
            let group = self.pages.last().map_or("continued", |p| p.group);
            self.start_page(group);
        }
    }

    fn push(&mut self, block: Block) {
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
    }

    fn section(&mut self, content: SectionContent) {
        if let Some(heading) = content.heading {
            if !self.at_page_top() {
                self.cursor_y += SECTION_GAP;
            }
            let size = self.spec.heading_size_pt;
            // keep the heading with at least one body line
            self.ensure(line_height(size) + 4.0 + line_height(self.spec.body_size_pt));
            self.text_line(BlockKind::Heading, heading, self.left, self.spec.heading_font, size, self.spec.accent);
            self.divider();
        }
        for line in content.lines {
            self.line(line);
        }
    }

    fn line(&mut self, line: Line) {
        let spec = self.spec;
        let body = spec.body_size_pt;
        match line {
            Line::Title(name) => {
                self.paragraph(&name, spec.heading_font, spec.name_size_pt, spec.accent, 0.0)
            }
            Line::Subtitle(text) => {
                self.paragraph(&text, spec.body_font, body + 1.5, spec.text_color, 0.0);
                self.cursor_y += ENTRY_GAP;
            }
            Line::Strong(text) => {
                if !self.at_page_top() {
                    self.cursor_y += ENTRY_GAP;
                }
                self.paragraph(&text, spec.heading_font, body, spec.text_color, 0.0)
            }
            Line::Plain(text) => self.paragraph(&text, spec.body_font, body, spec.text_color, 0.0),
            Line::Field(label, value) => self.paragraph(
                &format!("{label}: {value}"),
                spec.body_font,
                body,
                spec.text_color,
                0.0,
            ),
            Line::Bullet(text) => self.paragraph(
                &format!("\u{2022} {text}"),
                spec.body_font,
                body,
                spec.text_color,
                BULLET_INDENT,
            ),
            Line::Photo { reference, caption } => self.photo(reference, caption),
        }
    }

    fn paragraph(&mut self, text: &str, font: FontFamily, size: f32, color: [u8; 3], indent: f32) {
        let wrapped = get_metrics(font).wrap(text, self.width - indent, size);
        for line in wrapped {
            self.ensure(line_height(size));
            self.text_line(BlockKind::Text, &line, self.left + indent, font, size, color);
        }
    }

    fn text_line(&mut self, kind: BlockKind, text: &str, x: f32, font: FontFamily, size: f32, color: [u8; 3]) {
        let height = line_height(size);
        let width = get_metrics(font).measure_pt(text, size);
        let block = Block {
            kind,
            rect: Rect {
                x,
                y: self.cursor_y,
                width,
                height,
            },
            text: Some(text.to_string()),
            font,
            size_pt: size,
            color,
        };
        self.push(block);
        self.cursor_y += height;
    }

    fn divider(&mut self) {
        let block = Block {
            kind: BlockKind::Divider,
            rect: Rect {
                x: self.left,
                y: self.cursor_y + 1.0,
                width: self.width,
                height: 0.8,
            },
            text: None,
            font: self.spec.body_font,
            size_pt: 0.0,
            color: self.spec.accent,
        };
        self.push(block);
        self.cursor_y += 4.0;
    }

    /// Photos flow left to right, wrapping to a new row when the column is full.
    fn photo(&mut self, reference: String, caption: String) {
        let caption_size = self.spec.body_size_pt - 1.0;
        let slot_height = PHOTO_HEIGHT + line_height(caption_size) + PHOTO_GAP;

        let (x, top) = match self.next_photo_slot() {
            Some(slot) => slot,
            None => {
                self.ensure(slot_height);
                (self.left, self.cursor_y)
            }
        };

        self.push(Block {
            kind: BlockKind::PhotoFrame,
            rect: Rect {
                x,
                y: top,
                width: PHOTO_WIDTH,
                height: PHOTO_HEIGHT,
            },
            text: Some(reference),
            font: self.spec.body_font,
            size_pt: 0.0,
            color: self.spec.accent,
        });

        let caption = caption.trim();
        if !caption.is_empty() {
            let metrics = get_metrics(self.spec.body_font);
            let fitted = metrics
                .wrap(caption, PHOTO_WIDTH, caption_size)
                .into_iter()
                .next()
                .unwrap_or_default();
            self.cursor_y = top + PHOTO_HEIGHT;
            let (font, color) = (self.spec.body_font, self.spec.text_color);
            self.text_line(BlockKind::Text, &fitted, x, font, caption_size, color);
        }
        self.cursor_y = top + slot_height;
    }

    /// Position for another frame on the current row, if the previous block on
    /// this page is a photo and there is room to its right. The row top is read
    /// back from that frame.
    fn next_photo_slot(&self) -> Option<(f32, f32)> {
        let page = self.pages.last()?;
        let last_frame = page
            .blocks
            .iter()
            .rev()
            .take(2)
            .find(|b| b.kind == BlockKind::PhotoFrame)?;
        let x = last_frame.rect.x + PHOTO_WIDTH + PHOTO_GAP;
        (x + PHOTO_WIDTH <= self.left + self.width).then_some((x, last_frame.rect.y))
    }
}
