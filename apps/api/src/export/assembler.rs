//! PDF assembly.
//!
//! One PDF page per surface page, each a full-bleed JPEG (DCTDecode) raster
//! with the surface's text laid on top in the base-14 fonts (WinAnsiEncoding).
//! An optional watermark is drawn diagonally at reduced opacity through an
//! ExtGState. Objects, cross-references and serialization are left to `lopdf`.

use encoding_rs::WINDOWS_1252;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::export::job::Quality;
use crate::export::rasterizer::raster_dimensions;
use crate::export::ExportError;
use crate::render::metrics::{get_metrics, FontFamily};
use crate::render::{Block, RenderSurface};

const PDF_VERSION: &str = "1.4";
const IMAGE_NAME: &str = "Im0";
const WATERMARK_STATE: &str = "GS1";

const WATERMARK_FONT: FontFamily = FontFamily::HelveticaBold;
const WATERMARK_SIZE_PT: f32 = 54.0;
const WATERMARK_OPACITY: f32 = 0.18;

/// Fixed bytes for header, catalog, fonts, and trailer.
const BASE_OVERHEAD_BYTES: u64 = 1_200;
const PAGE_OVERHEAD_BYTES: u64 = 450;
/// Content-stream bytes per character of text (operators + escaping).
const TEXT_BYTES_PER_CHAR: u64 = 3;

/// Predicted artifact size in bytes. Deterministic, and never smaller for a
/// higher quality tier.
pub fn estimate_file_size(surface: &RenderSurface, quality: Quality) -> u64 {
    let (w, h) = raster_dimensions(surface.page_size, quality.dpi());
    let raster_bytes = (w as u64 * h as u64) * quality.bytes_per_kilopixel() / 1000;
    let pages = surface.page_count() as u64;
    let text_bytes = surface.text_len() as u64 * TEXT_BYTES_PER_CHAR;
    BASE_OVERHEAD_BYTES + pages * (PAGE_OVERHEAD_BYTES + raster_bytes) + text_bytes
}

/// Builds the PDF. `rasters[i]` is the capture of `surface.pages[i]`.
pub fn assemble_pdf(
    surface: &RenderSurface,
    rasters: &[RgbImage],
    quality: Quality,
    watermark: Option<&str>,
) -> Result<Vec<u8>, ExportError> {
    if surface.pages.is_empty() {
        return Err(ExportError::EmptySurface);
    }
    if rasters.len() != surface.pages.len() {
        return Err(ExportError::Encoding(format!(
            "{} rasters for {} pages",
            rasters.len(),
            surface.pages.len()
        )));
    }
    let watermark = watermark.map(str::trim).filter(|w| !w.is_empty());

    let mut doc = Document::with_version(PDF_VERSION);
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in FontFamily::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => WATERMARK_OPACITY,
        "CA" => WATERMARK_OPACITY,
    });

    let (width, height) = (surface.page_size.width_pt, surface.page_size.height_pt);
    let media_box: Vec<Object> = vec![0i64.into(), 0i64.into(), width.into(), height.into()];
    let mut kids: Vec<Object> = Vec::with_capacity(surface.pages.len());

    for (page, raster) in surface.pages.iter().zip(rasters) {
        let image_id = doc.add_object(jpeg_xobject(raster, quality)?);

        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0i64.into(), 0i64.into(), height.into(), 0i64.into(), 0i64.into()],
            ),
            Operation::new("Do", vec![IMAGE_NAME.into()]),
            Operation::new("Q", vec![]),
        ];
        for block in page.blocks.iter().filter(|b| b.is_text()) {
            text_operations(block, height, &mut operations);
        }
        if let Some(mark) = watermark {
            watermark_operations(mark, width, height, &mut operations);
        }
        let content = Content { operations }.encode()?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Resources" => dictionary! {
                "Font" => fonts.clone(),
                "XObject" => dictionary! { IMAGE_NAME => image_id },
                "ExtGState" => dictionary! { WATERMARK_STATE => gs_id },
            },
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| ExportError::Encoding(format!("PDF serialization failed: {e}")))?;
    Ok(buf)
}

/// JPEG-encodes a page raster as an image XObject. The stream is stored
/// as-is so the DCT data is not deflated on save.
fn jpeg_xobject(raster: &RgbImage, quality: Quality) -> Result<Stream, ExportError> {
    let mut jpeg = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.jpeg_quality());
        encoder.encode_image(raster)?;
    }
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(raster.width()),
        "Height" => i64::from(raster.height()),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8i64,
        "Filter" => "DCTDecode",
    };
    Ok(Stream::new(dict, jpeg).with_compression(false))
}

fn text_operations(block: &Block, page_height: f32, out: &mut Vec<Operation>) {
    let Some(text) = block.text.as_deref() else {
        return;
    };
    let [r, g, b] = block.color.map(|c| Object::from(c as f32 / 255.0));
    let baseline = page_height - (block.rect.y + block.size_pt);
    out.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![block.font.resource_name().into(), block.size_pt.into()]),
        Operation::new("rg", vec![r, g, b]),
        Operation::new("Td", vec![block.rect.x.into(), baseline.into()]),
        Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]),
        Operation::new("ET", vec![]),
    ]);
}

/// Centered, 45°-rotated stamp in light grey.
fn watermark_operations(text: &str, width: f32, height: f32, out: &mut Vec<Operation>) {
    let text_width = get_metrics(WATERMARK_FONT).measure_pt(text, WATERMARK_SIZE_PT);
    let (sin, cos) = std::f32::consts::FRAC_PI_4.sin_cos();
    let x = width / 2.0 - cos * text_width / 2.0;
    let y = height / 2.0 - sin * text_width / 2.0;
    out.extend([
        Operation::new("q", vec![]),
        Operation::new("gs", vec![WATERMARK_STATE.into()]),
        Operation::new("rg", vec![0.5f32.into(), 0.5f32.into(), 0.5f32.into()]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![WATERMARK_FONT.resource_name().into(), WATERMARK_SIZE_PT.into()]),
        Operation::new(
            "Tm",
            vec![cos.into(), sin.into(), (-sin).into(), cos.into(), x.into(), y.into()],
        ),
        Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);
}

/// Text bytes for the base fonts' WinAnsiEncoding. Characters outside
/// windows-1252 become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut utf8 = [0u8; 4];
    for c in text.chars() {
        let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut utf8));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::rasterizer::{BlockRasterizer, Rasterizer};
    use crate::models::draft::{DocumentKind, Draft, SectionKey};
    use crate::render::{render, TemplateId};
    use serde_json::json;

    fn surface(entries: usize) -> RenderSurface {
        let experience: Vec<_> = (0..entries)
            .map(|i| json!({"company": format!("Acme ({i})"), "position": "Engineer", "description": "Kept the lights on."}))
            .collect();
        let draft = Draft::new(DocumentKind::Resume)
            .with_section(SectionKey::PersonalInfo, &json!({"fullName": "Ann Lee"}))
            .unwrap()
            .with_section(SectionKey::Experience, &json!(experience))
            .unwrap();
        render(&draft, TemplateId::Modern).unwrap()
    }

    fn rasters(surface: &RenderSurface, dpi: u32) -> Vec<RgbImage> {
        surface
            .pages
            .iter()
            .map(|p| BlockRasterizer.rasterize(p, surface.page_size, dpi).unwrap())
            .collect()
    }

    /// Every `Tj` string on every page, in page order.
    fn shown_strings(pdf: &[u8]) -> Vec<Vec<Vec<u8>>> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|page_id| {
                let content = Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
                content
                    .operations
                    .into_iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| match op.operands.into_iter().next() {
                        Some(Object::String(bytes, _)) => Some(bytes),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    fn operators(pdf: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .flat_map(|page_id| {
                Content::decode(&doc.get_page_content(*page_id).unwrap())
                    .unwrap()
                    .operations
                    .into_iter()
                    .map(|op| op.operator)
            })
            .collect()
    }

    #[test]
    fn test_estimate_is_monotone_in_quality() {
        let s = surface(3);
        let low = estimate_file_size(&s, Quality::Low);
        let medium = estimate_file_size(&s, Quality::Medium);
        let high = estimate_file_size(&s, Quality::High);
        assert!(low <= medium && medium <= high);
        assert_eq!(low, estimate_file_size(&s, Quality::Low));
    }

    #[test]
    fn test_estimate_grows_with_pages() {
        assert!(estimate_file_size(&surface(40), Quality::Low) > estimate_file_size(&surface(1), Quality::Low));
    }

    #[test]
    fn test_pdf_structure() {
        let s = surface(1);
        let pdf = assemble_pdf(&s, &rasters(&s, 18), Quality::Low, None).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.4"));

        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let images = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|st| st.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice()))
            .count();
        assert_eq!(images, 1);

        let strings = shown_strings(&pdf);
        assert!(strings[0].iter().any(|s| s.as_slice() == b"Ann Lee"));
        assert!(!operators(&pdf).iter().any(|op| op == "gs"));
    }

    #[test]
    fn test_one_pdf_page_per_surface_page() {
        let s = surface(40);
        assert!(s.page_count() > 1);
        let pdf = assemble_pdf(&s, &rasters(&s, 18), Quality::Low, None).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), s.page_count());
    }

    #[test]
    fn test_watermark_is_stamped_on_every_page() {
        let s = surface(40);
        let pdf = assemble_pdf(&s, &rasters(&s, 18), Quality::Low, Some("DRAFT")).unwrap();
        for page in shown_strings(&pdf) {
            assert_eq!(page.iter().filter(|s| s.as_slice() == b"DRAFT").count(), 1);
        }
        let stamps = operators(&pdf).iter().filter(|op| *op == "gs").count();
        assert_eq!(stamps, s.page_count());
    }

    #[test]
    fn test_text_survives_parentheses() {
        let s = surface(1);
        let pdf = assemble_pdf(&s, &rasters(&s, 18), Quality::Low, None).unwrap();
        let strings = shown_strings(&pdf);
        assert!(strings[0].iter().any(|s| s.starts_with(b"Engineer, Acme (0)")));
    }

    #[test]
    fn test_win_ansi_mapping() {
        assert_eq!(win_ansi("Ann"), b"Ann".to_vec());
        assert_eq!(win_ansi("\u{2022} caf\u{e9}"), vec![0x95, b' ', b'c', b'a', b'f', 0xE9]);
        assert_eq!(win_ansi("\u{0928}"), b"?".to_vec());
    }

    #[test]
    fn test_mismatched_rasters_are_rejected() {
        let s = surface(1);
        assert!(matches!(
            assemble_pdf(&s, &[], Quality::Low, None),
            Err(ExportError::Encoding(_))
        ));
    }
}
