// Export Pipeline: RenderSurface → raster pages → PDF → artifact store.
// Capture and assembly are CPU-bound and run inside tokio::task::spawn_blocking.

pub mod artifacts;
pub mod assembler;
pub mod handlers;
pub mod job;
pub mod pipeline;
pub mod rasterizer;

use thiserror::Error;

pub use artifacts::{ArtifactRef, ArtifactStore, MemoryArtifactStore, S3ArtifactStore};
pub use pipeline::{ExportPipeline, ExportSettings};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: the document has no pages")]
    EmptySurface,

    #[error("nothing to export: the page size is zero")]
    ZeroSizePage,

    #[error("page raster of {pixels} pixels exceeds the {limit} pixel budget")]
    MemoryBudget { pixels: u64, limit: u64 },

    #[error("page capture failed: {0}")]
    Capture(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("export is {size} bytes, above the {limit} byte limit")]
    SizeLimit { size: u64, limit: u64 },

    #[error("artifact storage failed: {0}")]
    Storage(String),

    #[error("export timed out after {0} seconds")]
    TimedOut(u64),
}

impl From<image::ImageError> for ExportError {
    fn from(e: image::ImageError) -> Self {
        ExportError::Encoding(e.to_string())
    }
}

impl From<lopdf::Error> for ExportError {
    fn from(e: lopdf::Error) -> Self {
        ExportError::Encoding(e.to_string())
    }
}
