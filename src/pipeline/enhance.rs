//! Per-document enhancement hints.

use crate::models::{DocumentType, EnhancementHint, Priority, UnifiedSnapshot};
use serde_json::Value;

const MIN_PRD_SECTIONS: usize = 3;
const MIN_STRATEGY_SECTIONS: usize = 2;
const MIN_FAQ_ENTRIES: usize = 3;

/// Advisory hints for slots that look under-specified. Empty slots get none.
pub fn check_for_enhancement_needs(snapshot: &UnifiedSnapshot) -> Vec<EnhancementHint> {
    let mut hints = Vec::new();

    if !snapshot.prd.is_empty() && snapshot.prd.len() < MIN_PRD_SECTIONS {
        hints.push(EnhancementHint {
            document_type: DocumentType::Prd,
            suggestion: "PRD appears incomplete. Consider expanding its structure and clarity."
                .to_string(),
            priority: Priority::Medium,
        });
    }

    if !snapshot.strategy.is_empty() && snapshot.strategy.len() < MIN_STRATEGY_SECTIONS {
        hints.push(EnhancementHint {
            document_type: DocumentType::Strategy,
            suggestion: "Strategy document could be more comprehensive.".to_string(),
            priority: Priority::Medium,
        });
    }

    if let Some(Value::Array(faqs)) = snapshot.prfaq.get("frequently_asked_questions") {
        if faqs.len() < MIN_FAQ_ENTRIES {
            hints.push(EnhancementHint {
                document_type: DocumentType::Prfaq,
                suggestion: "PRFAQ could benefit from more comprehensive FAQs.".to_string(),
                priority: Priority::Low,
            });
        }
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> UnifiedSnapshot {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_snapshot_has_no_hints() {
        assert!(check_for_enhancement_needs(&UnifiedSnapshot::default()).is_empty());
    }

    #[test]
    fn test_thin_documents_get_hints() {
        let hints = check_for_enhancement_needs(&snapshot(json!({
            "prd": {"overview": "o", "solution": "s"},
            "strategy": {"vision": "v"},
            "prfaq": {
                "press_release": "p",
                "frequently_asked_questions": [{"question": "q", "answer": "a"}]
            }
        })));

        let types: Vec<_> = hints.iter().map(|h| h.document_type).collect();
        assert_eq!(
            types,
            vec![DocumentType::Prd, DocumentType::Strategy, DocumentType::Prfaq]
        );
        assert_eq!(hints[2].priority, Priority::Low);
    }

    #[test]
    fn test_complete_documents_get_no_hints() {
        let hints = check_for_enhancement_needs(&snapshot(json!({
            "prd": {"overview": "o", "problem": "p", "solution": "s"},
            "strategy": {"vision": "v", "approach": "a"},
            "prfaq": {"frequently_asked_questions": "Q: only prose"}
        })));
        assert!(hints.is_empty());
    }
}
