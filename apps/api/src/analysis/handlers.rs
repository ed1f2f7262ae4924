//! Axum route handlers for the Analysis API.

use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::analysis::pipeline::{delete_analysis, wipe_all, AnalysisInput, AnalysisPipeline};
use crate::errors::AppError;
use crate::models::record::{record_key, AnalysisRecord, RECORD_KEY_PREFIX};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub resumes: Vec<AnalysisRecord>,
}

#[derive(Debug, Serialize)]
pub struct WipeResponse {
    pub deleted: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes
///
/// Multipart form: `file` (the resume PDF, required), `company_name`,
/// `job_title`, `job_description` (optional, may be empty). Runs the full
/// pipeline and returns the new record id; the caller fetches the record
/// separately.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut company_name = String::new();
    let mut job_title = String::new();
    let mut job_description = String::new();
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("could not read file field: {e}")))?;
                file = Some((file_name, bytes));
            }
            "company_name" => company_name = read_text(field).await?,
            "job_title" => job_title = read_text(field).await?,
            "job_description" => job_description = read_text(field).await?,
            _ => {} // unknown fields are ignored
        }
    }

    let (file_name, file) =
        file.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;
    if file.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".to_string()));
    }

    let pipeline = AnalysisPipeline::new(
        state.store.clone(),
        state.converter.clone(),
        state.inference.clone(),
        Duration::from_secs(state.config.inference_timeout_secs),
    );

    let id = pipeline
        .run(AnalysisInput {
            company_name,
            job_title,
            job_description,
            file_name,
            file,
        })
        .await?;

    Ok(Json(AnalyzeResponse { id }))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("could not read text field: {e}")))
}

/// GET /api/v1/resumes
///
/// Returns every stored analysis record, newest first.
pub async fn handle_list(State(state): State<AppState>) -> Result<Json<ListResponse>, AppError> {
    let mut resumes = state.store.list(RECORD_KEY_PREFIX).await?;
    resumes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(ListResponse { resumes }))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisRecord>, AppError> {
    let record = state
        .store
        .get(&record_key(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))?;
    Ok(Json(record))
}

/// DELETE /api/v1/resumes/:id
///
/// Removes the record and its two files. Idempotent: deleting an unknown id
/// or a record whose files are already gone succeeds.
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    delete_analysis(state.store.as_ref(), id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

/// POST /api/v1/resumes/wipe
///
/// Deletes every analysis record and its files, isolating per-item failures.
pub async fn handle_wipe(State(state): State<AppState>) -> Result<Json<WipeResponse>, AppError> {
    let deleted = wipe_all(state.store.as_ref()).await?;
    Ok(Json(WipeResponse { deleted }))
}
