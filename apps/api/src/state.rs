use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::InferenceClient;
use crate::render::DocumentConverter;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum
/// extractors. The collaborators are trait objects so handlers and the
/// pipeline never depend on Redis, S3, pdfium, or the Anthropic API
/// directly.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub converter: Arc<dyn DocumentConverter>,
    pub inference: Arc<dyn InferenceClient>,
    pub config: Config,
}
