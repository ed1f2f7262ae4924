//! Feedback schema — the validated output of one analysis run.
//!
//! The JSON key spelling (`overallScore`, `ATS`, `toneAndStyle`, …) is part
//! of the placeholder contract sent to the inference service and must not
//! change, so every field carries an explicit serde rename where the Rust
//! name differs.

use serde::{Deserialize, Serialize};

/// Full structured critique for a resume: an overall score plus the five
/// fixed category reviews. A record holds either all of this or none of it —
/// partial feedback is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "overallScore")]
    pub overall_score: u8,
    #[serde(rename = "ATS")]
    pub ats: Category,
    #[serde(rename = "toneAndStyle")]
    pub tone_and_style: Category,
    pub content: Category,
    pub structure: Category,
    pub skills: Category,
}

/// A single scored category with its ordered tips. Tip order reflects the
/// inference output and is preserved, not re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub score: u8,
    pub tips: Vec<Tip>,
}

/// One actionable tip inside a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    /// Required for every category except ATS, where tips may carry only a
    /// short label. Enforced during extraction, not here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Closed enumeration — the inference service may not introduce new kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}
