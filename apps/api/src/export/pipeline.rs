//! Background export jobs.
//!
//! `request_export` records a `pending` job and returns it at once; a spawned
//! task captures each page (progress 10→70), assembles the PDF (90), uploads
//! it (100) and marks the job `completed`. Any error, the timeout, or a cancel
//! ends the job `failed` with a readable message. A job never stays
//! `processing` once its task is gone. Finished jobs are kept for a retention
//! window so clients can poll them, then pruned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use bytes::Bytes;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::export::artifacts::{ArtifactRef, ArtifactStore};
use crate::export::assembler::assemble_pdf;
use crate::export::job::{ExportJob, ExportOptions, ExportStatus};
use crate::export::rasterizer::{raster_dimensions, Rasterizer, MAX_PAGE_PIXELS};
use crate::export::ExportError;
use crate::render::RenderSurface;

pub const CANCELLED_MESSAGE: &str = "export cancelled";

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub timeout: Duration,
    pub max_bytes: u64,
    pub max_page_pixels: u64,
    /// Base for download URLs, e.g. `https://docs.example.com`.
    pub public_base_url: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_bytes: 20 * 1024 * 1024,
            max_page_pixels: MAX_PAGE_PIXELS,
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

struct TrackedJob {
    job: ExportJob,
    /// When the job reached a terminal status.
    finished_at: Option<Instant>,
}

pub struct ExportPipeline {
    jobs: RwLock<HashMap<Uuid, TrackedJob>>,
    handles: Mutex<HashMap<Uuid, AbortHandle>>,
    rasterizer: Arc<dyn Rasterizer>,
    artifacts: Arc<dyn ArtifactStore>,
    settings: ExportSettings,
}

impl ExportPipeline {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        artifacts: Arc<dyn ArtifactStore>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            rasterizer,
            artifacts,
            settings,
        }
    }

    /// Starts exporting `surface` and returns the `pending` job.
    pub fn request_export(
        self: &Arc<Self>,
        surface: RenderSurface,
        draft_id: Uuid,
        options: ExportOptions,
    ) -> ExportJob {
        let job = ExportJob::new(draft_id, surface.template, &options);
        let id = job.id;
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id,
                TrackedJob {
                    job: job.clone(),
                    finished_at: None,
                },
            );

        // hold the handle map while spawning so the task cannot finish (and
        // remove its handle) before the handle is recorded
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        let pipeline = self.clone();
        let task = tokio::spawn(async move { pipeline.run(id, draft_id, surface, options).await });
        handles.insert(id, task.abort_handle());

        info!(job_id = %id, %draft_id, "Export requested");
        job
    }

    pub fn job(&self, id: Uuid) -> Option<ExportJob> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .map(|tracked| tracked.job.clone())
    }

    /// Abandons the job's in-flight work. The job ends `failed` with
    /// "export cancelled" unless it had already finished.
    pub fn cancel(&self, id: Uuid) -> Option<ExportJob> {
        let handle = self
            .handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        if let Some(handle) = handle {
            handle.abort();
            info!(job_id = %id, "Export cancelled");
        }
        self.update(id, |job| job.fail(CANCELLED_MESSAGE));
        self.job(id)
    }

    /// Cancels every unfinished job of `draft_id`. Returns how many were cancelled.
    pub fn cancel_for_draft(&self, draft_id: Uuid) -> usize {
        let ids: Vec<Uuid> = self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|t| t.job.draft_id == draft_id && !t.job.status.is_terminal())
            .map(|t| t.job.id)
            .collect();
        for id in &ids {
            self.cancel(*id);
        }
        if !ids.is_empty() {
            info!(%draft_id, cancelled = ids.len(), "Draft exports cancelled");
        }
        ids.len()
    }

    /// Drops jobs that finished at least `retention` ago. Unfinished jobs are
    /// never pruned. Returns how many were dropped.
    pub fn prune_finished(&self, retention: Duration) -> usize {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let before = jobs.len();
        jobs.retain(|_, t| t.finished_at.map_or(true, |at| at.elapsed() < retention));
        before - jobs.len()
    }

    /// Runs `prune_finished` every `every` until the pipeline is dropped.
    pub fn spawn_prune_sweep(self: &Arc<Self>, retention: Duration, every: Duration) -> JoinHandle<()> {
        let pipeline = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(pipeline) = pipeline.upgrade() else {
                    break;
                };
                let pruned = pipeline.prune_finished(retention);
                if pruned > 0 {
                    debug!(pruned, "Finished export jobs pruned");
                }
            }
        })
    }

    /// Artifact of a completed job.
    pub fn artifact(&self, id: Uuid) -> Option<ArtifactRef> {
        self.job(id)
            .filter(|job| job.status == ExportStatus::Completed)
            .and_then(|job| job.artifact)
    }

    pub async fn artifact_bytes(&self, artifact: &ArtifactRef) -> Result<Option<Bytes>, ExportError> {
        self.artifacts.get(&artifact.key).await
    }

    fn download_url(&self, id: Uuid) -> String {
        format!(
            "{}/api/v1/exports/{id}/download",
            self.settings.public_base_url.trim_end_matches('/')
        )
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut ExportJob)) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        if let Some(tracked) = jobs.get_mut(&id) {
            f(&mut tracked.job);
            if tracked.finished_at.is_none() && tracked.job.status.is_terminal() {
                tracked.finished_at = Some(Instant::now());
            }
        }
    }

    async fn run(self: Arc<Self>, id: Uuid, draft_id: Uuid, surface: RenderSurface, options: ExportOptions) {
        self.update(id, |job| job.start());

        let produced = tokio::time::timeout(
            self.settings.timeout,
            self.produce(id, draft_id, surface, options),
        )
        .await
        .unwrap_or_else(|_| Err(ExportError::TimedOut(self.settings.timeout.as_secs())));

        match produced {
            Ok(artifact) => {
                let url = self.download_url(id);
                info!(job_id = %id, size_bytes = artifact.size_bytes, "Export completed");
                self.update(id, |job| job.complete(artifact, url));
            }
            Err(e) => {
                warn!(job_id = %id, "Export failed: {e}");
                self.update(id, |job| job.fail(e.to_string()));
            }
        }

        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    async fn produce(
        &self,
        id: Uuid,
        draft_id: Uuid,
        surface: RenderSurface,
        options: ExportOptions,
    ) -> Result<ArtifactRef, ExportError> {
        if surface.pages.is_empty() {
            return Err(ExportError::EmptySurface);
        }
        if surface.page_size.is_empty() {
            return Err(ExportError::ZeroSizePage);
        }

        let dpi = options.quality.dpi();
        let (w, h) = raster_dimensions(surface.page_size, dpi);
        let pixels = w as u64 * h as u64;
        if pixels > self.settings.max_page_pixels {
            return Err(ExportError::MemoryBudget {
                pixels,
                limit: self.settings.max_page_pixels,
            });
        }
        self.update(id, |job| job.set_progress(10));

        // 1. capture
        let total = surface.pages.len();
        let mut rasters = Vec::with_capacity(total);
        for (i, page) in surface.pages.iter().enumerate() {
            let rasterizer = self.rasterizer.clone();
            let page = page.clone();
            let size = surface.page_size;
            let raster = tokio::task::spawn_blocking(move || rasterizer.rasterize(&page, size, dpi))
                .await
                .map_err(|e| ExportError::Capture(e.to_string()))??;
            rasters.push(raster);
            let progress = 10 + ((i + 1) * 60 / total) as u8;
            self.update(id, |job| job.set_progress(progress));
        }

        // 2-3. assemble + watermark
        let quality = options.quality;
        let watermark = options.watermark.clone();
        let pdf = tokio::task::spawn_blocking(move || {
            assemble_pdf(&surface, &rasters, quality, watermark.as_deref())
        })
        .await
        .map_err(|e| ExportError::Encoding(e.to_string()))??;
        self.update(id, |job| job.set_progress(90));

        let size = pdf.len() as u64;
        if size > self.settings.max_bytes {
            return Err(ExportError::SizeLimit {
                size,
                limit: self.settings.max_bytes,
            });
        }

        // 4. upload
        let key = format!("exports/{draft_id}/{id}.{}", options.format.extension());
        self.artifacts
            .put(&key, Bytes::from(pdf), options.format.content_type())
            .await
    }
}
