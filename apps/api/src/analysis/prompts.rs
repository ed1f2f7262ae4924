//! Prompt constants for the analysis pipeline.
//!
//! The example payload is the placeholder contract: a literal JSON object
//! whose every value is a bracketed token marking where a real value
//! belongs. This is the primary (non-enforced) mechanism for shaping the
//! model's output — the extraction layer exists precisely because the model
//! is not guaranteed to honor it.

/// Output-schema example with bracketed placeholder tokens for every field.
/// ATS tips omit `explanation` deliberately — it is optional there and
/// required everywhere else.
pub const FEEDBACK_EXAMPLE_FORMAT: &str = r#"{
  "overallScore": [SCORE_BETWEEN_0_100],
  "ATS": {
    "score": [SCORE_BETWEEN_0_100],
    "tips": [
      { "type": "[good_or_improve]", "tip": "[SHORT_TIP_LABEL]" }
    ]
  },
  "toneAndStyle": {
    "score": [SCORE_BETWEEN_0_100],
    "tips": [
      { "type": "[good_or_improve]", "tip": "[SHORT_TIP_LABEL]", "explanation": "[DETAILED_EXPLANATION]" }
    ]
  },
  "content": {
    "score": [SCORE_BETWEEN_0_100],
    "tips": [
      { "type": "[good_or_improve]", "tip": "[SHORT_TIP_LABEL]", "explanation": "[DETAILED_EXPLANATION]" }
    ]
  },
  "structure": {
    "score": [SCORE_BETWEEN_0_100],
    "tips": [
      { "type": "[good_or_improve]", "tip": "[SHORT_TIP_LABEL]", "explanation": "[DETAILED_EXPLANATION]" }
    ]
  },
  "skills": {
    "score": [SCORE_BETWEEN_0_100],
    "tips": [
      { "type": "[good_or_improve]", "tip": "[SHORT_TIP_LABEL]", "explanation": "[DETAILED_EXPLANATION]" }
    ]
  }
}"#;

/// Analysis prompt template. Replace `{job_title}`, `{job_description}` and
/// `{example_format}` before sending.
const ANALYZE_PROMPT_TEMPLATE: &str = r#"Analyze the provided resume image against the job below.
Provide a detailed, critical review with scores and actionable tips. Be strict with scoring to provide the most value.

The job title is: {job_title}
The job description is: "{job_description}"

You MUST respond with a JSON object that follows this exact structure, replacing every bracketed placeholder with a real value:
{example_format}

Your response MUST be ONLY the raw JSON object, starting with { and ending with }.
Do NOT include the word "json", markdown backticks, or any other text, comments, or explanations before or after the JSON object."#;

/// Builds the full instruction string for one analysis run.
///
/// Pure and deterministic; both inputs may be empty and are interpolated
/// verbatim.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    ANALYZE_PROMPT_TEMPLATE
        .replace("{job_title}", job_title)
        .replace("{job_description}", job_description)
        .replace("{example_format}", FEEDBACK_EXAMPLE_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_interpolate_inputs_verbatim() {
        let prompt = prepare_instructions("Backend Engineer", "Go, distributed systems");
        assert!(prompt.contains("The job title is: Backend Engineer"));
        assert!(prompt.contains(r#"The job description is: "Go, distributed systems""#));
    }

    #[test]
    fn test_instructions_carry_the_placeholder_contract() {
        let prompt = prepare_instructions("X", "Y");
        assert!(prompt.contains("[SCORE_BETWEEN_0_100]"));
        assert!(prompt.contains("[good_or_improve]"));
        assert!(prompt.contains(r#""toneAndStyle""#));
        assert!(prompt.contains(r#""ATS""#));
        assert!(prompt.contains("ONLY the raw JSON object"));
    }

    #[test]
    fn test_instructions_are_deterministic_and_accept_empty_inputs() {
        assert_eq!(prepare_instructions("", ""), prepare_instructions("", ""));
        assert!(!prepare_instructions("", "").is_empty());
    }
}
