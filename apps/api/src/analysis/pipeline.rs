//! Pipeline Orchestrator — one analysis run from upload to persisted
//! feedback.
//!
//! Flow: upload resume → convert first page → upload image →
//!       persist draft record → invoke inference → extract feedback →
//!       persist final record.
//!
//! The record is written BEFORE inference on purpose: if inference or
//! extraction fails, the run is still inspectable by id instead of being
//! lost. No step is retried here and no uploaded file is cleaned up on
//! failure — a failed run is terminal, and the caller starts a fresh run
//! with a new id. Already-uploaded files from failed runs are only removed
//! by the explicit delete/wipe operations (known leak, see DESIGN.md).
//!
//! Cancellation is drop-based: every external call is an await point, and
//! dropping the run future aborts the remainder without cleanup.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::extract::{extract_feedback, ExtractError};
use crate::analysis::prompts::prepare_instructions;
use crate::llm_client::InferenceClient;
use crate::models::record::{record_key, AnalysisRecord, RECORD_KEY_PREFIX};
use crate::render::{ConvertError, DocumentConverter};
use crate::store::{ensure_file_absent, RecordStore, StoreError};

// ────────────────────────────────────────────────────────────────────────────
// Stages & errors
// ────────────────────────────────────────────────────────────────────────────

/// The linear happy path. Any stage may be the last if the run fails; the
/// failure itself is carried by [`PipelineError`], not by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Uploading,
    Converting,
    UploadingImage,
    PersistingDraft,
    Invoking,
    Extracting,
    PersistingFinal,
    Done,
}

impl AnalysisStage {
    /// Human-readable progress text. Observable side effect only — nothing
    /// downstream depends on these strings.
    pub fn description(self) -> &'static str {
        match self {
            AnalysisStage::Uploading => "Uploading the file...",
            AnalysisStage::Converting => "Converting to image...",
            AnalysisStage::UploadingImage => "Uploading the image...",
            AnalysisStage::PersistingDraft => "Preparing data...",
            AnalysisStage::Invoking => "Analyzing...",
            AnalysisStage::Extracting => "Reading the response...",
            AnalysisStage::PersistingFinal => "Saving the results...",
            AnalysisStage::Done => "Analysis complete",
        }
    }
}

/// Terminal failure kinds for one run. None of these are retried by the
/// orchestrator; re-running is the caller's decision and gets a new id.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not upload the {artifact}: {reason}")]
    UploadFailed {
        artifact: &'static str,
        reason: String,
    },

    #[error("could not read the document: {0}")]
    Conversion(#[from] ConvertError),

    #[error("the analysis service could not be reached: {0}")]
    InferenceFailed(String),

    #[error("the analysis service returned nothing usable")]
    EmptyInferenceResponse,

    #[error("the analysis service's answer could not be understood: {0}")]
    Extraction(#[from] ExtractError),

    #[error("could not save the analysis record: {0}")]
    StoreWriteFailed(String),
}

impl PipelineError {
    /// Stable machine-readable code for the API error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::UploadFailed { .. } => "UPLOAD_FAILED",
            PipelineError::Conversion(ConvertError::UnsupportedFormat(_)) => "UNSUPPORTED_FORMAT",
            PipelineError::Conversion(_) => "CONVERSION_FAILED",
            PipelineError::InferenceFailed(_) => "INFERENCE_FAILED",
            PipelineError::EmptyInferenceResponse => "EMPTY_INFERENCE_RESPONSE",
            PipelineError::Extraction(ExtractError::NoStructuredPayload) => "NO_STRUCTURED_PAYLOAD",
            PipelineError::Extraction(ExtractError::MalformedPayload { .. }) => "MALFORMED_PAYLOAD",
            PipelineError::Extraction(ExtractError::SchemaViolation { .. }) => "SCHEMA_VIOLATION",
            PipelineError::StoreWriteFailed(_) => "STORE_WRITE_FAILED",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Caller-supplied inputs for one run. All free-text fields may be empty.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub file_name: String,
    pub file: Bytes,
}

/// One-run orchestrator. Collaborators are explicit capabilities passed at
/// construction, never ambient globals, so runs are independently mockable.
/// No mutable state is shared across runs.
pub struct AnalysisPipeline {
    store: Arc<dyn RecordStore>,
    converter: Arc<dyn DocumentConverter>,
    inference: Arc<dyn InferenceClient>,
    inference_timeout: Duration,
    status: watch::Sender<&'static str>,
}

impl AnalysisPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        converter: Arc<dyn DocumentConverter>,
        inference: Arc<dyn InferenceClient>,
        inference_timeout: Duration,
    ) -> Self {
        let (status, _) = watch::channel("Idle");
        Self {
            store,
            converter,
            inference,
            inference_timeout,
            status,
        }
    }

    /// Progress text for the current run, updated at every stage transition.
    pub fn subscribe(&self) -> watch::Receiver<&'static str> {
        self.status.subscribe()
    }

    fn advance(&self, stage: AnalysisStage) {
        info!("{}", stage.description());
        // send fails only when no receiver is subscribed, which is fine.
        let _ = self.status.send(stage.description());
    }

    /// Runs the full pipeline and returns the new record's id. The caller
    /// fetches the record separately to display it.
    pub async fn run(&self, input: AnalysisInput) -> Result<Uuid, PipelineError> {
        let id = Uuid::new_v4();
        info!("Starting analysis run {id}");

        self.advance(AnalysisStage::Uploading);
        let resume_path = self
            .store
            .upload_file(&input.file_name, input.file.clone())
            .await
            .map_err(|e| PipelineError::UploadFailed {
                artifact: "resume",
                reason: e.to_string(),
            })?;

        self.advance(AnalysisStage::Converting);
        let image = self.converter.convert_first_page(input.file.clone()).await?;

        self.advance(AnalysisStage::UploadingImage);
        let image_path = self
            .store
            .upload_file(&format!("{id}.png"), Bytes::from(image.clone()))
            .await
            .map_err(|e| PipelineError::UploadFailed {
                artifact: "image",
                reason: e.to_string(),
            })?;

        self.advance(AnalysisStage::PersistingDraft);
        let mut record = AnalysisRecord {
            id,
            resume_path,
            image_path,
            company_name: input.company_name,
            job_title: input.job_title,
            job_description: input.job_description,
            feedback: None,
            created_at: Utc::now(),
        };
        self.store
            .put(&record_key(id), &record)
            .await
            .map_err(|e| PipelineError::StoreWriteFailed(e.to_string()))?;

        self.advance(AnalysisStage::Invoking);
        let instructions = prepare_instructions(&record.job_title, &record.job_description);
        let raw = tokio::time::timeout(
            self.inference_timeout,
            self.inference.review_image(&image, &instructions),
        )
        .await
        .map_err(|_| {
            PipelineError::InferenceFailed(format!(
                "timed out after {}s",
                self.inference_timeout.as_secs()
            ))
        })?
        .map_err(|e| PipelineError::InferenceFailed(e.to_string()))?;

        if raw.trim().is_empty() {
            return Err(PipelineError::EmptyInferenceResponse);
        }

        self.advance(AnalysisStage::Extracting);
        let feedback = extract_feedback(&raw)?;

        self.advance(AnalysisStage::PersistingFinal);
        record.feedback = Some(feedback);
        self.store
            .put(&record_key(id), &record)
            .await
            .map_err(|e| PipelineError::StoreWriteFailed(e.to_string()))?;

        self.advance(AnalysisStage::Done);
        info!("Analysis run {id} complete");
        Ok(id)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Deletion
// ────────────────────────────────────────────────────────────────────────────

/// Deletes one analysis: both files best-effort, then the record key.
/// Idempotent — an unknown id or already-removed files are not errors.
pub async fn delete_analysis(store: &dyn RecordStore, id: Uuid) -> Result<(), StoreError> {
    if let Some(record) = store.get(&record_key(id)).await? {
        ensure_file_absent(store, &record.resume_path).await;
        ensure_file_absent(store, &record.image_path).await;
    }
    store.delete(&record_key(id)).await
}

/// Deletes every analysis record and its files. Per-item failures are
/// isolated: a stuck file never blocks key removal, and one record's
/// trouble never aborts the rest. Returns how many records were found.
pub async fn wipe_all(store: &dyn RecordStore) -> Result<usize, StoreError> {
    let records = store.list(RECORD_KEY_PREFIX).await?;
    for record in &records {
        ensure_file_absent(store, &record.resume_path).await;
        ensure_file_absent(store, &record.image_path).await;
        if let Err(e) = store.delete(&record_key(record.id)).await {
            warn!("Could not delete record {} during wipe: {e}", record.id);
        }
    }
    // Final sweep catches keys whose records could not be listed or deleted
    // individually.
    store.delete_all(RECORD_KEY_PREFIX).await?;
    Ok(records.len())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
