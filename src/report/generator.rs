//! Markdown and JSON alignment reports.

use crate::models::{
    AlignmentResult, EnhancementHint, Misalignment, Priority, ProcessDetails, Suggestion,
    SuggestionSummary,
};
use crate::store::AnalysisRecord;
use anyhow::Result;

/// Generate a complete Markdown report for one run.
pub fn generate_markdown_report(record: &AnalysisRecord, model: &str) -> String {
    let result = &record.result;
    let mut output = String::new();

    output.push_str("# DocSync Alignment Report\n\n");
    output.push_str(&generate_metadata_section(record, model));
    output.push_str(&generate_score_section(result));
    output.push_str(&generate_summary_section(&result.analysis.suggestions));
    output.push_str(&generate_misalignments_section(
        &result.analysis.critical_misalignments,
    ));
    output.push_str(&generate_suggestions_section(&result.analysis.suggestions));
    output.push_str(&generate_hints_section(&result.enhancement_suggestions));

    if let Some(ref details) = result.process_details {
        output.push_str(&generate_process_section(details));
    }

    if !result.analysis.overall_assessment.is_empty() {
        output.push_str("## Overall Assessment\n\n");
        output.push_str(&result.analysis.overall_assessment);
        output.push_str("\n\n");
    }

    output.push_str("---\n\n");
    output.push_str(&format!(
        "*Report generated by docsync v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    output
}

fn generate_metadata_section(record: &AnalysisRecord, model: &str) -> String {
    let counts = record.snapshot.slot_counts();
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Trigger:** {}\n", record.trigger));
    section.push_str(&format!("- **Model Used:** `{}`\n", model));
    section.push_str(&format!(
        "- **Processing Method:** `{}`\n",
        record.result.processing_method
    ));
    section.push_str(&format!(
        "- **API Calls Used:** {}\n",
        record.result.api_calls_used
    ));
    section.push_str(&format!(
        "- **Content:** PRD {} | PRFAQ {} | Strategy {} | Tickets {}\n\n",
        counts.prd, counts.prfaq, counts.strategy, counts.tickets
    ));

    section
}

fn generate_score_section(result: &AlignmentResult) -> String {
    let score = result.analysis.alignment_score;
    let mut section = String::new();

    section.push_str("## Alignment Score\n\n");
    section.push_str(&format!(
        "**{}/10** {}\n\n",
        score,
        "█".repeat(score as usize) + &"░".repeat(10usize.saturating_sub(score as usize))
    ));

    if result.is_degraded() {
        section.push_str(&format!(
            "> ⚠️ Analysis ran in degraded mode (`{}`); treat the score as provisional.\n\n",
            result.processing_method
        ));
    }

    section
}

fn generate_summary_section(suggestions: &[Suggestion]) -> String {
    let summary = SuggestionSummary::from_suggestions(suggestions);
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "| {} High | {} Medium | {} Low | **Total** |\n",
        Priority::High.emoji(),
        Priority::Medium.emoji(),
        Priority::Low.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        summary.high, summary.medium, summary.low, summary.total
    ));

    if !summary.by_type.is_empty() {
        section.push_str("### Suggestions by Type\n\n");
        section.push_str("| Type | Count |\n");
        section.push_str("|:---|:---:|\n");

        let mut kinds: Vec<_> = summary.by_type.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (kind, count) in kinds {
            section.push_str(&format!("| {} | {} |\n", kind, count));
        }
        section.push('\n');
    }

    section
}

fn generate_misalignments_section(misalignments: &[Misalignment]) -> String {
    let mut section = String::new();

    section.push_str("## Critical Misalignments\n\n");

    if misalignments.is_empty() {
        section.push_str("No critical misalignments were reported.\n\n");
        return section;
    }

    let mut sorted: Vec<_> = misalignments.iter().collect();
    sorted.sort_by(|a, b| b.impact.cmp(&a.impact));

    for misalignment in sorted {
        section.push_str(&format!(
            "### {} {}\n\n",
            misalignment.impact.emoji(),
            misalignment.issue
        ));
        if !misalignment.documents.is_empty() {
            section.push_str(&format!(
                "**Documents:** {}\n\n",
                misalignment.documents.join(" ↔ ")
            ));
        }
        section.push_str(&format!("**Impact:** {}\n\n", misalignment.impact));
        if !misalignment.suggestion.is_empty() {
            section.push_str(&format!("> 💡 **Fix:** {}\n\n", misalignment.suggestion));
        }
    }

    section
}

fn generate_suggestions_section(suggestions: &[Suggestion]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<_> = suggestions.iter().collect();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut section = String::new();
    section.push_str("## Suggestions\n\n");

    for (i, suggestion) in sorted.iter().enumerate() {
        section.push_str(&format!(
            "{}. {} **{}** `{}` {}",
            i + 1,
            suggestion.priority.emoji(),
            suggestion.priority,
            suggestion.action,
            suggestion.description
        ));
        if !suggestion.source.is_empty() || !suggestion.target.is_empty() {
            section.push_str(&format!(
                " *({} → {})*",
                suggestion.source, suggestion.target
            ));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

fn generate_hints_section(hints: &[EnhancementHint]) -> String {
    if hints.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Document Enhancements\n\n");

    for hint in hints {
        section.push_str(&format!(
            "- {} **{}:** {}\n",
            hint.priority.emoji(),
            hint.document_type.as_str().to_uppercase(),
            hint.suggestion
        ));
    }
    section.push('\n');

    section
}

fn generate_process_section(details: &ProcessDetails) -> String {
    let mut section = String::new();

    section.push_str("## Self-Critique Process\n\n");
    section.push_str("<details>\n<summary>Initial analysis</summary>\n\n```\n");
    section.push_str(&details.initial_response);
    section.push_str("\n```\n</details>\n\n");

    section.push_str("<details>\n<summary>Critique</summary>\n\n");
    section.push_str(&details.critique);
    section.push_str("\n</details>\n\n");

    section.push_str("<details>\n<summary>Enhanced analysis</summary>\n\n```\n");
    section.push_str(&details.enhanced_response);
    section.push_str("\n```\n</details>\n\n");

    section
}

/// Pretty JSON of the alignment result, using the persisted field names.
pub fn generate_json_report(result: &AlignmentResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(Into::into)
}
