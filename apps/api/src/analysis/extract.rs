//! Extraction & Validation — turns raw inference output into a typed
//! [`Feedback`] value, or refuses.
//!
//! Inference output is adversarial by default: the model may wrap its answer
//! in prose, code fences, or a "Here is the JSON:" preamble despite the
//! instructions. The boundary is two-phase by design:
//!
//! 1. a permissive scan that isolates the first `{` through the last `}`;
//! 2. a strict, all-or-nothing schema walk that names the first offending
//!    field.
//!
//! There is no best-effort mode. Out-of-range scores are rejected, never
//! clamped; missing fields are rejected, never defaulted. Unknown extra
//! fields are ignored. Pure function — no I/O, idempotent.

use serde_json::Value;
use thiserror::Error;

use crate::models::feedback::{Category, Feedback, Tip, TipKind};

/// How much of the offending payload to keep for diagnostics.
const SNIPPET_LEN: usize = 160;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    /// The response contains no `{` at all — nothing to even attempt.
    #[error("response contains no JSON object")]
    NoStructuredPayload,

    /// The brace-delimited substring is not parseable JSON (truncated,
    /// unbalanced, or plain garbage).
    #[error("embedded JSON could not be parsed: {snippet}")]
    MalformedPayload { snippet: String },

    /// The payload parsed but does not satisfy the feedback schema.
    #[error("feedback schema violation at '{field}': {reason}")]
    SchemaViolation { field: String, reason: String },
}

fn violation(field: &str, reason: impl Into<String>) -> ExtractError {
    ExtractError::SchemaViolation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Extracts and validates a [`Feedback`] value embedded in `raw`.
pub fn extract_feedback(raw: &str) -> Result<Feedback, ExtractError> {
    let start = raw.find('{').ok_or(ExtractError::NoStructuredPayload)?;
    // A missing or misplaced closing brace is a truncated payload: hand the
    // tail to the parser and let it report the malformation.
    let candidate = match raw.rfind('}') {
        Some(end) if end > start => &raw[start..=end],
        _ => &raw[start..],
    };

    let value: Value =
        serde_json::from_str(candidate).map_err(|_| ExtractError::MalformedPayload {
            snippet: snippet_of(candidate),
        })?;

    validate_feedback(&value)
}

/// Walks the parsed payload in schema order, so the reported violation is
/// always the first offending field.
fn validate_feedback(root: &Value) -> Result<Feedback, ExtractError> {
    let obj = root
        .as_object()
        .ok_or_else(|| violation("feedback", "expected a JSON object"))?;

    let overall_score = require_score("feedback.overallScore", obj.get("overallScore"))?;
    // ATS tips may carry only a short label; every other category requires
    // an explanation per tip.
    let ats = require_category("feedback.ATS", obj.get("ATS"), false)?;
    let tone_and_style = require_category("feedback.toneAndStyle", obj.get("toneAndStyle"), true)?;
    let content = require_category("feedback.content", obj.get("content"), true)?;
    let structure = require_category("feedback.structure", obj.get("structure"), true)?;
    let skills = require_category("feedback.skills", obj.get("skills"), true)?;

    Ok(Feedback {
        overall_score,
        ats,
        tone_and_style,
        content,
        structure,
        skills,
    })
}

fn require_score(field: &str, value: Option<&Value>) -> Result<u8, ExtractError> {
    let value = value.ok_or_else(|| violation(field, "missing required field"))?;
    // as_i64 rejects floats and strings — "85.0" and 85.5 both fail here.
    let score = value
        .as_i64()
        .ok_or_else(|| violation(field, "expected an integer"))?;
    if !(0..=100).contains(&score) {
        return Err(violation(
            field,
            format!("score {score} is outside the range 0-100"),
        ));
    }
    Ok(score as u8)
}

fn require_category(
    field: &str,
    value: Option<&Value>,
    explanation_required: bool,
) -> Result<Category, ExtractError> {
    let value = value.ok_or_else(|| violation(field, "missing required field"))?;
    let obj = value
        .as_object()
        .ok_or_else(|| violation(field, "expected a JSON object"))?;

    let score = require_score(&format!("{field}.score"), obj.get("score"))?;

    let tips_field = format!("{field}.tips");
    let tips_value = obj
        .get("tips")
        .ok_or_else(|| violation(&tips_field, "missing required field"))?;
    let tips_array = tips_value
        .as_array()
        .ok_or_else(|| violation(&tips_field, "expected an array"))?;

    let mut tips = Vec::with_capacity(tips_array.len());
    for (i, tip) in tips_array.iter().enumerate() {
        tips.push(require_tip(
            &format!("{tips_field}[{i}]"),
            tip,
            explanation_required,
        )?);
    }

    Ok(Category { score, tips })
}

fn require_tip(
    field: &str,
    value: &Value,
    explanation_required: bool,
) -> Result<Tip, ExtractError> {
    let obj = value
        .as_object()
        .ok_or_else(|| violation(field, "expected a JSON object"))?;

    let kind_field = format!("{field}.type");
    let kind = match obj.get("type") {
        None => return Err(violation(&kind_field, "missing required field")),
        Some(v) => match v.as_str() {
            Some("good") => TipKind::Good,
            Some("improve") => TipKind::Improve,
            Some(other) => {
                return Err(violation(
                    &kind_field,
                    format!("'{other}' is not one of 'good' or 'improve'"),
                ))
            }
            None => return Err(violation(&kind_field, "expected a string")),
        },
    };

    let tip_field = format!("{field}.tip");
    let tip = obj
        .get("tip")
        .ok_or_else(|| violation(&tip_field, "missing required field"))?
        .as_str()
        .ok_or_else(|| violation(&tip_field, "expected a string"))?;
    if tip.trim().is_empty() {
        return Err(violation(&tip_field, "must be non-empty"));
    }

    let explanation_field = format!("{field}.explanation");
    let explanation = match obj.get("explanation") {
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| violation(&explanation_field, "expected a string"))?
                .to_string(),
        ),
        None => None,
    };
    if explanation_required && explanation.is_none() {
        return Err(violation(&explanation_field, "missing required field"));
    }

    Ok(Tip {
        kind,
        tip: tip.to_string(),
        explanation,
    })
}

fn snippet_of(text: &str) -> String {
    if text.len() <= SNIPPET_LEN {
        return text.to_string();
    }
    let mut end = SNIPPET_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A complete, valid payload used as the mutation baseline.
    fn valid_payload() -> serde_json::Value {
        serde_json::json!({
            "overallScore": 72,
            "ATS": {
                "score": 80,
                "tips": [{"type": "good", "tip": "Keyword match"}]
            },
            "toneAndStyle": {
                "score": 70,
                "tips": [{
                    "type": "improve",
                    "tip": "More active voice",
                    "explanation": "Passive phrasing reduces impact."
                }]
            },
            "content": {"score": 65, "tips": []},
            "structure": {"score": 90, "tips": []},
            "skills": {"score": 60, "tips": []}
        })
    }

    #[test]
    fn test_extraction_discards_surrounding_prose() {
        let raw = format!(
            "Sure! Here is the JSON: {} Hope this helps!",
            valid_payload()
        );
        let feedback = extract_feedback(&raw).unwrap();
        assert_eq!(feedback.overall_score, 72);
        assert_eq!(feedback.ats.score, 80);
        assert_eq!(feedback.ats.tips[0].tip, "Keyword match");
        assert_eq!(feedback.skills.score, 60);
    }

    #[test]
    fn test_extraction_survives_markdown_fences() {
        let raw = format!("```json\n{}\n```", valid_payload());
        let feedback = extract_feedback(&raw).unwrap();
        assert_eq!(feedback.overall_score, 72);
    }

    #[test]
    fn test_roundtrip_through_arbitrary_prose() {
        let original = extract_feedback(&valid_payload().to_string()).unwrap();
        let embedded = format!(
            "I analyzed the resume carefully.\n{}\nLet me know if you need more detail.",
            serde_json::to_string(&original).unwrap()
        );
        let reextracted = extract_feedback(&embedded).unwrap();
        assert_eq!(reextracted, original);
    }

    #[test]
    fn test_no_brace_is_no_structured_payload() {
        assert_eq!(
            extract_feedback("I'm sorry, I can't analyze this resume."),
            Err(ExtractError::NoStructuredPayload)
        );
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let full = valid_payload().to_string();
        let truncated = &full[..full.len() / 2];
        assert!(matches!(
            extract_feedback(truncated),
            Err(ExtractError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_unbalanced_braces_are_malformed() {
        assert!(matches!(
            extract_feedback(r#"{"overallScore": 72"#),
            Err(ExtractError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_missing_skills_score_names_the_field() {
        let mut payload = valid_payload();
        payload["skills"].as_object_mut().unwrap().remove("score");
        let err = extract_feedback(&payload.to_string()).unwrap_err();
        assert_eq!(
            err,
            ExtractError::SchemaViolation {
                field: "feedback.skills.score".to_string(),
                reason: "missing required field".to_string(),
            }
        );
    }

    #[test]
    fn test_out_of_range_scores_are_rejected_not_clamped() {
        for bad in [-1, 101, 1000] {
            let mut payload = valid_payload();
            payload["content"]["score"] = serde_json::json!(bad);
            let err = extract_feedback(&payload.to_string()).unwrap_err();
            assert!(
                matches!(&err, ExtractError::SchemaViolation { field, .. }
                    if field == "feedback.content.score"),
                "score {bad} produced {err:?}"
            );
        }
    }

    #[test]
    fn test_float_score_is_a_schema_violation() {
        let mut payload = valid_payload();
        payload["overallScore"] = serde_json::json!(72.5);
        let err = extract_feedback(&payload.to_string()).unwrap_err();
        assert!(matches!(&err, ExtractError::SchemaViolation { field, .. }
            if field == "feedback.overallScore"));
    }

    #[test]
    fn test_unknown_tip_type_is_rejected() {
        let mut payload = valid_payload();
        payload["ATS"]["tips"][0]["type"] = serde_json::json!("neutral");
        let err = extract_feedback(&payload.to_string()).unwrap_err();
        assert!(matches!(&err, ExtractError::SchemaViolation { field, .. }
            if field == "feedback.ATS.tips[0].type"));
    }

    #[test]
    fn test_empty_tip_text_is_rejected() {
        let mut payload = valid_payload();
        payload["ATS"]["tips"][0]["tip"] = serde_json::json!("   ");
        let err = extract_feedback(&payload.to_string()).unwrap_err();
        assert!(matches!(&err, ExtractError::SchemaViolation { field, .. }
            if field == "feedback.ATS.tips[0].tip"));
    }

    #[test]
    fn test_ats_explanation_is_optional_elsewhere_required() {
        // Valid payload already has an ATS tip with no explanation.
        assert!(extract_feedback(&valid_payload().to_string()).is_ok());

        let mut payload = valid_payload();
        payload["toneAndStyle"]["tips"][0]
            .as_object_mut()
            .unwrap()
            .remove("explanation");
        let err = extract_feedback(&payload.to_string()).unwrap_err();
        assert!(matches!(&err, ExtractError::SchemaViolation { field, .. }
            if field == "feedback.toneAndStyle.tips[0].explanation"));
    }

    #[test]
    fn test_unknown_extra_fields_are_ignored() {
        let mut payload = valid_payload();
        payload["confidence"] = serde_json::json!(0.93);
        payload["ATS"]["notes"] = serde_json::json!("extra commentary");
        let feedback = extract_feedback(&payload.to_string()).unwrap();
        assert_eq!(feedback.overall_score, 72);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let raw = format!("noise {} noise", valid_payload());
        let first = extract_feedback(&raw);
        let second = extract_feedback(&raw);
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_snippet_is_bounded() {
        let raw = format!("{{\"overallScore\": {}", "9".repeat(500));
        match extract_feedback(&raw) {
            Err(ExtractError::MalformedPayload { snippet }) => {
                assert!(snippet.len() <= SNIPPET_LEN + 3);
            }
            other => panic!("expected MalformedPayload, got {other:?}"),
        }
    }
}
