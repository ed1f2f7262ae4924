//! The analysis record — the unit of work and the unit of persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::feedback::Feedback;

/// Key prefix under which all analysis records live in the store.
pub const RECORD_KEY_PREFIX: &str = "resume:";

/// Storage key for one analysis record: `resume:{id}`.
pub fn record_key(id: Uuid) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

/// One analysis run's persisted state.
///
/// Written twice per successful run: once after both file uploads succeed
/// (feedback absent) and once after extraction (feedback populated). The
/// feedback transition is one-way — a populated record is never reverted.
/// Corrections require a new run with a new id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    /// Location of the uploaded source document. Set once, never mutated.
    pub resume_path: String,
    /// Location of the converted page image. Set once, never mutated.
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}
