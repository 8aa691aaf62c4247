use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::export::artifacts::ArtifactRef;
use crate::render::TemplateId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Completed | ExportStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Pdf,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Capture resolution and compression tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Low, Quality::Medium, Quality::High];

    pub fn dpi(&self) -> u32 {
        match self {
            Quality::Low => 72,
            Quality::Medium => 150,
            Quality::High => 300,
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        match self {
            Quality::Low => 60,
            Quality::Medium => 80,
            Quality::High => 92,
        }
    }

    /// Expected encoded bytes per 1000 raster pixels.
    pub fn bytes_per_kilopixel(&self) -> u64 {
        match self {
            Quality::Low => 100,
            Quality::Medium => 180,
            Quality::High => 350,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub quality: Quality,
    /// Text stamped diagonally across every page.
    pub watermark: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub status: ExportStatus,
    pub format: ExportFormat,
    pub template: TemplateId,
    pub quality: Quality,
    /// 0–100.
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip)]
    pub artifact: Option<ArtifactRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExportJob {
    pub fn new(draft_id: Uuid, template: TemplateId, options: &ExportOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            draft_id,
            status: ExportStatus::Pending,
            format: options.format,
            template,
            quality: options.quality,
            progress: 0,
            download_url: None,
            artifact: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    // Transitions below are ignored once the job is terminal.

    pub fn start(&mut self) {
        if self.status == ExportStatus::Pending {
            self.status = ExportStatus::Processing;
            self.touch();
        }
    }

    pub fn set_progress(&mut self, progress: u8) {
        if !self.status.is_terminal() {
            self.progress = progress.min(100).max(self.progress);
            self.touch();
        }
    }

    pub fn complete(&mut self, artifact: ArtifactRef, download_url: String) {
        if !self.status.is_terminal() {
            self.status = ExportStatus::Completed;
            self.progress = 100;
            self.artifact = Some(artifact);
            self.download_url = Some(download_url);
            self.touch();
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = ExportStatus::Failed;
            self.error = Some(message.into());
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
