use std::sync::Arc;

use crate::export::ExportPipeline;
use crate::share::ShareService;
use crate::wizard::session::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Live wizard sessions, each with its debounced snapshot writer.
    pub sessions: Arc<SessionRegistry>,
    pub exports: Arc<ExportPipeline>,
    pub shares: Arc<ShareService>,
}
