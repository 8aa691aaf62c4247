//! RenderSurface: the paginated, positioned output of the template renderer.
//!
//! Coordinates are in PDF points with a top-left origin; the PDF assembler flips
//! the y axis when it writes content streams.

use serde::Serialize;

use crate::models::draft::DocumentKind;
use crate::render::metrics::FontFamily;
use crate::render::templates::TemplateId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    /// ISO A4 portrait.
    pub const A4: PageSize = PageSize {
        width_pt: 595.0,
        height_pt: 842.0,
    };

    pub fn is_empty(&self) -> bool {
        self.width_pt <= 0.0 || self.height_pt <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Solid background fill.
    Panel,
    Heading,
    Text,
    /// Horizontal rule.
    Divider,
    /// Reserved frame for an uploaded photo; `text` carries the photo reference.
    PhotoFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    pub rect: Rect,
    /// One wrapped line for text blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub font: FontFamily,
    pub size_pt: f32,
    pub color: [u8; 3],
}

impl Block {
    pub fn is_text(&self) -> bool {
        matches!(self.kind, BlockKind::Heading | BlockKind::Text) && self.text.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfacePage {
    pub index: usize,
    /// Section group this page belongs to.
    pub group: &'static str,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSurface {
    pub kind: DocumentKind,
    pub template: TemplateId,
    pub page_size: PageSize,
    pub pages: Vec<SurfacePage>,
}

impl RenderSurface {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total characters of text across all pages.
    pub fn text_len(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.blocks.iter())
            .filter_map(|b| b.text.as_deref())
            .map(str::len)
            .sum()
    }
}
