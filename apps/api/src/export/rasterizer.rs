//! Page capture.
//!
//! The default `BlockRasterizer` paints the non-text blocks of a page (panels,
//! dividers, photo frames) into an RGB image. Text is not rasterized: the PDF
//! assembler lays it over the raster as real PDF text.

use image::{Rgb, RgbImage};

use crate::export::ExportError;
use crate::render::{Block, BlockKind, PageSize, Rect, SurfacePage};

/// Largest raster a single page may allocate.
pub const MAX_PAGE_PIXELS: u64 = 40_000_000;

pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, page: &SurfacePage, size: PageSize, dpi: u32) -> Result<RgbImage, ExportError>;
}

/// Pixel dimensions of a page captured at `dpi`.
pub fn raster_dimensions(size: PageSize, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / 72.0;
    (
        (size.width_pt * scale).ceil().max(0.0) as u32,
        (size.height_pt * scale).ceil().max(0.0) as u32,
    )
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BlockRasterizer;

impl Rasterizer for BlockRasterizer {
    fn rasterize(&self, page: &SurfacePage, size: PageSize, dpi: u32) -> Result<RgbImage, ExportError> {
        let (width, height) = raster_dimensions(size, dpi);
        if width == 0 || height == 0 {
            return Err(ExportError::ZeroSizePage);
        }
        let scale = dpi as f32 / 72.0;
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

        for block in &page.blocks {
            paint(&mut canvas, block, scale);
        }
        Ok(canvas)
    }
}

fn paint(canvas: &mut RgbImage, block: &Block, scale: f32) {
    match block.kind {
        BlockKind::Panel => fill(canvas, block.rect, scale, block.color),
        BlockKind::Divider => {
            // at least one device pixel tall
            let min_height = 1.0 / scale;
            let rect = Rect {
                height: block.rect.height.max(min_height),
                ..block.rect
            };
            fill(canvas, rect, scale, block.color)
        }
        BlockKind::PhotoFrame => {
            fill(canvas, block.rect, scale, tint(block.color, 0.88));
            outline(canvas, block.rect, scale, block.color, 1.5);
        }
        BlockKind::Heading | BlockKind::Text => {}
    }
}

/// Mixes `color` toward white by `amount` (0 = unchanged, 1 = white).
fn tint(color: [u8; 3], amount: f32) -> [u8; 3] {
    color.map(|c| (c as f32 + (255.0 - c as f32) * amount).round() as u8)
}

fn fill(canvas: &mut RgbImage, rect: Rect, scale: f32, color: [u8; 3]) {
    let (w, h) = canvas.dimensions();
    let x0 = ((rect.x * scale).floor().max(0.0) as u32).min(w);
    let y0 = ((rect.y * scale).floor().max(0.0) as u32).min(h);
    let x1 = (((rect.x + rect.width) * scale).ceil().max(0.0) as u32).min(w);
    let y1 = (((rect.y + rect.height) * scale).ceil().max(0.0) as u32).min(h);
    let pixel = Rgb(color);
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, pixel);
        }
    }
}

fn outline(canvas: &mut RgbImage, rect: Rect, scale: f32, color: [u8; 3], stroke_pt: f32) {
    let edges = [
        Rect { height: stroke_pt, ..rect },
        Rect {
            y: rect.y + rect.height - stroke_pt,
            height: stroke_pt,
            ..rect
        },
        Rect { width: stroke_pt, ..rect },
        Rect {
            x: rect.x + rect.width - stroke_pt,
            width: stroke_pt,
            ..rect
        },
    ];
    for edge in edges {
        fill(canvas, edge, scale, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::metrics::FontFamily;

    fn block(kind: BlockKind, rect: Rect, color: [u8; 3]) -> Block {
        Block {
            kind,
            rect,
            text: None,
            font: FontFamily::Helvetica,
            size_pt: 0.0,
            color,
        }
    }

    fn page(blocks: Vec<Block>) -> SurfacePage {
        SurfacePage {
            index: 0,
            group: "test",
            blocks,
        }
    }

    #[test]
    fn test_dimensions_scale_with_dpi() {
        assert_eq!(raster_dimensions(PageSize::A4, 72), (595, 842));
        assert_eq!(raster_dimensions(PageSize::A4, 144), (1190, 1684));
    }

    #[test]
    fn test_panels_are_painted_and_text_is_not() {
        let rect = Rect { x: 0.0, y: 0.0, width: 100.0, height: 842.0 };
        let mut text = block(BlockKind::Text, Rect { x: 200.0, y: 10.0, width: 50.0, height: 12.0 }, [0, 0, 0]);
        text.text = Some("hello".to_string());
        let page = page(vec![block(BlockKind::Panel, rect, [10, 20, 30]), text]);

        let img = BlockRasterizer.rasterize(&page, PageSize::A4, 72).unwrap();
        assert_eq!(img.get_pixel(50, 400), &Rgb([10, 20, 30]));
        assert_eq!(img.get_pixel(210, 15), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_thin_divider_still_visible() {
        let rect = Rect { x: 10.0, y: 100.0, width: 200.0, height: 0.2 };
        let page = page(vec![block(BlockKind::Divider, rect, [0, 0, 0])]);
        let img = BlockRasterizer.rasterize(&page, PageSize::A4, 72).unwrap();
        assert_eq!(img.get_pixel(50, 100), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_photo_frame_has_border_and_fill() {
        let rect = Rect { x: 100.0, y: 100.0, width: 150.0, height: 190.0 };
        let page = page(vec![block(BlockKind::PhotoFrame, rect, [100, 0, 0])]);
        let img = BlockRasterizer.rasterize(&page, PageSize::A4, 72).unwrap();
        assert_eq!(img.get_pixel(100, 150), &Rgb([100, 0, 0]));
        assert_eq!(img.get_pixel(175, 195), &Rgb(tint([100, 0, 0], 0.88)));
    }

    #[test]
    fn test_blocks_outside_page_are_clipped() {
        let rect = Rect { x: 500.0, y: 800.0, width: 400.0, height: 400.0 };
        let page = page(vec![block(BlockKind::Panel, rect, [1, 2, 3])]);
        let img = BlockRasterizer.rasterize(&page, PageSize::A4, 72).unwrap();
        assert_eq!(img.get_pixel(594, 841), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_zero_size_page_is_an_error() {
        let size = PageSize { width_pt: 0.0, height_pt: 842.0 };
        assert!(matches!(
            BlockRasterizer.rasterize(&page(vec![]), size, 72),
            Err(ExportError::ZeroSizePage)
        ));
    }
}
