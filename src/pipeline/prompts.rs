//! Prompt construction for the three analysis steps.

/// Analysis prompt. Requests the payload shape verbatim.
pub fn alignment_prompt(snapshot_json: &str) -> String {
    format!(
        r#"
# Document Alignment Analysis

Analyze these project documents for alignment issues and provide specific, actionable suggestions:

## Project Content:
{snapshot_json}

Provide analysis as JSON:
{{
    "alignment_score": 1-10,
    "critical_misalignments": [
        {{
            "issue": "Specific misalignment description",
            "documents": ["source_doc", "target_doc"],
            "impact": "High|Medium|Low",
            "suggestion": "Specific action to fix this misalignment"
        }}
    ],
    "suggestions": [
        {{
            "type": "prd_to_tickets|tickets_to_prd|strategy_alignment|prfaq_alignment",
            "action": "create|update|review|remove",
            "description": "Specific actionable suggestion",
            "priority": "High|Medium|Low",
            "source": "Source document type",
            "target": "Target document type"
        }}
    ],
    "overall_assessment": "Brief summary of document alignment status and next steps"
}}

Focus on specific, actionable alignment issues between:
- PRD requirements vs implementation tickets
- Strategy goals vs PRD features
- Customer messaging (PRFAQ) vs actual functionality
- Timeline consistency across documents
- Missing connections between related concepts

Ensure all suggestions are specific enough to be immediately actionable.
"#
    )
}

/// Critique prompt over the first analysis and a snapshot excerpt.
pub fn critique_prompt(initial_response: &str, snapshot_excerpt: &str) -> String {
    format!(
        r#"
You previously generated this document alignment analysis:

{initial_response}

For this project content:
{snapshot_excerpt}...

Critically evaluate your alignment analysis:

1. **Accuracy**: Are the identified misalignments actually present in the documents?
2. **Completeness**: What important alignment issues did you miss?
3. **Specificity**: Are your suggestions specific enough to be actionable?
4. **Prioritization**: Did you focus on the most critical alignment issues?
5. **Cross-Document Relationships**: Did you properly analyze relationships between different document types?

Focus on genuine improvements to make the alignment analysis more accurate and actionable.
Be honest about what could be better.
"#
    )
}

/// Refine prompt carrying the first analysis, its critique and the excerpt again.
pub fn refine_prompt(initial_response: &str, critique: &str, snapshot_excerpt: &str) -> String {
    format!(
        r#"
Original alignment analysis:
{initial_response}

Self-critique identifying areas for improvement:
{critique}

Project content:
{snapshot_excerpt}...

Provide an enhanced alignment analysis that addresses the critique while maintaining the same JSON format.

Focus on:
- More accurate identification of real misalignments
- More specific, actionable suggestions
- Better prioritization of critical alignment issues
- Complete coverage of document relationships

Ensure all suggestions are specific and implementable.
"#
    )
}

/// First `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
