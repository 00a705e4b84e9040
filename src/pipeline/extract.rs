//! Best-effort JSON extraction from free-text responses.

use crate::models::AnalysisPayload;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no JSON object in response")]
    NoJsonFound,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// The span from the first `{` to the last `}`.
pub fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn try_extract_payload(text: &str) -> Result<AnalysisPayload, ExtractError> {
    let span = json_span(text).ok_or(ExtractError::NoJsonFound)?;
    Ok(serde_json::from_str(span)?)
}

/// Extract the payload, or the minimal payload when the response holds none.
pub fn extract_payload(text: &str) -> AnalysisPayload {
    match try_extract_payload(text) {
        Ok(payload) => payload,
        Err(ExtractError::NoJsonFound) => {
            debug!("Response holds no JSON object, using minimal payload");
            AnalysisPayload::minimal()
        }
        Err(e) => {
            warn!("Could not parse analysis JSON: {}", e);
            AnalysisPayload::minimal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Priority};

    const WRAPPED: &str = r#"Here is my analysis of the documents.

{
    "alignment_score": 6,
    "critical_misalignments": [
        {
            "issue": "PRD requires password reset but no ticket covers it",
            "documents": ["prd", "tickets"],
            "impact": "High",
            "suggestion": "Create a ticket for password reset"
        }
    ],
    "suggestions": [
        {
            "type": "prd_to_tickets",
            "action": "create",
            "description": "Add a password reset ticket",
            "priority": "High",
            "source": "prd",
            "target": "tickets"
        }
    ],
    "overall_assessment": "Mostly aligned; one gap in authentication."
}

Let me know if you want more detail on {any} section."#;

    #[test]
    fn test_extracts_payload_wrapped_in_prose() {
        let payload = extract_payload(WRAPPED.split("Let me know").next().unwrap());
        assert_eq!(payload.alignment_score, 6);
        assert_eq!(payload.critical_misalignments[0].impact, Priority::High);
        assert_eq!(payload.suggestions[0].action, Action::Create);
        assert_eq!(payload.suggestions[0].target, "tickets");
    }

    #[test]
    fn test_trailing_braces_break_the_greedy_span() {
        // The span runs to the last closing brace, so trailing prose with
        // braces makes the object unparseable.
        assert!(matches!(
            try_extract_payload(WRAPPED),
            Err(ExtractError::InvalidJson(_))
        ));
        assert_eq!(extract_payload(WRAPPED), AnalysisPayload::minimal());
    }

    #[test]
    fn test_prose_after_object_without_braces() {
        let text = "Analysis:\n{\"alignment_score\": 9, \"overall_assessment\": \"Aligned\"}\nThanks!";
        let payload = extract_payload(text);
        assert_eq!(payload.alignment_score, 9);
        assert_eq!(payload.overall_assessment, "Aligned");
    }

    #[test]
    fn test_null_impact_does_not_discard_response() {
        let text = r#"Result: {"alignment_score": 3, "critical_misalignments": [{"issue": "Pricing differs", "documents": ["prd", "strategy"], "impact": null, "suggestion": "Pick one price"}], "overall_assessment": "Poor"}"#;
        let payload = extract_payload(text);
        assert_eq!(payload.alignment_score, 3);
        assert_eq!(payload.overall_assessment, "Poor");
        assert_eq!(payload.critical_misalignments.len(), 1);
        assert_eq!(payload.critical_misalignments[0].impact, Priority::Medium);
    }

    #[test]
    fn test_no_json_gives_minimal_payload() {
        let payload = extract_payload("I could not analyze these documents.");
        assert_eq!(payload.alignment_score, 5);
        assert!(payload.suggestions.is_empty());
        assert_eq!(
            payload.overall_assessment,
            "Alignment analysis completed with basic processing."
        );
    }

    #[test]
    fn test_json_span() {
        assert_eq!(json_span("a {b} c {d} e"), Some("{b} c {d}"));
        assert_eq!(json_span("} backwards {"), None);
        assert_eq!(json_span("none"), None);
    }
}
