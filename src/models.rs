//! Data models for document alignment.
//!
//! This module contains the shared data structures: the unified snapshot
//! built from all connected sources, the normalized change sets produced
//! by webhooks, and the alignment result produced by the pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Section name to text (or nested sections, or a list such as FAQs).
pub type StructuredContent = Map<String, Value>;

/// Content of each aggregated document, keyed by document id.
pub type DocumentVersions = BTreeMap<String, StructuredContent>;

/// Kind of connected source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    GoogleDocs,
    Jira,
    Linear,
    Confluence,
}

/// What a source contributes to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    /// Typed documents that replace a snapshot slot wholesale.
    Documents,
    /// Tickets appended to the backlog.
    Tickets,
    /// Labelled wiki pages merged key-by-key.
    Wiki,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::GoogleDocs,
        SourceKind::Jira,
        SourceKind::Linear,
        SourceKind::Confluence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::GoogleDocs => "google_docs",
            SourceKind::Jira => "jira",
            SourceKind::Linear => "linear",
            SourceKind::Confluence => "confluence",
        }
    }

    pub fn role(&self) -> SourceRole {
        match self {
            SourceKind::GoogleDocs => SourceRole::Documents,
            SourceKind::Jira | SourceKind::Linear => SourceRole::Tickets,
            SourceKind::Confluence => SourceRole::Wiki,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown source: {}", s))
    }
}

/// Declared type of a connected document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Prd,
    Prfaq,
    Strategy,
    Generic,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Prd => "prd",
            DocumentType::Prfaq => "prfaq",
            DocumentType::Strategy => "strategy",
            DocumentType::Generic => "generic",
        }
    }

    /// Guess the document type from its id when the user did not declare one.
    pub fn infer_from_id(id: &str) -> Self {
        let id = id.to_lowercase();
        if id.contains("prfaq") {
            DocumentType::Prfaq
        } else if id.contains("strategy") {
            DocumentType::Strategy
        } else {
            DocumentType::Prd
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prd" => Ok(DocumentType::Prd),
            "prfaq" => Ok(DocumentType::Prfaq),
            "strategy" => Ok(DocumentType::Strategy),
            "generic" => Ok(DocumentType::Generic),
            other => Err(format!("Unknown document type: {}", other)),
        }
    }
}

/// A ticket collected from a backlog source. Never mutated once collected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub assignee: Option<String>,
}

/// Point-in-time aggregation of every connected source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedSnapshot {
    #[serde(default)]
    pub prd: StructuredContent,
    #[serde(default)]
    pub prfaq: StructuredContent,
    #[serde(default)]
    pub strategy: StructuredContent,
    /// Flat concatenation of every ticket source, in registration order.
    #[serde(default)]
    pub tickets: Vec<Ticket>,
}

impl UnifiedSnapshot {
    /// The slot a document type routes to. Generic documents have none.
    pub fn slot(&self, doc_type: DocumentType) -> Option<&StructuredContent> {
        match doc_type {
            DocumentType::Prd => Some(&self.prd),
            DocumentType::Prfaq => Some(&self.prfaq),
            DocumentType::Strategy => Some(&self.strategy),
            DocumentType::Generic => None,
        }
    }

    pub fn slot_mut(&mut self, doc_type: DocumentType) -> Option<&mut StructuredContent> {
        match doc_type {
            DocumentType::Prd => Some(&mut self.prd),
            DocumentType::Prfaq => Some(&mut self.prfaq),
            DocumentType::Strategy => Some(&mut self.strategy),
            DocumentType::Generic => None,
        }
    }

    /// Document key counts plus the ticket count.
    pub fn total_sections(&self) -> usize {
        self.prd.len() + self.prfaq.len() + self.strategy.len() + self.tickets.len()
    }

    /// Number of the four slots holding anything.
    pub fn non_empty_slots(&self) -> usize {
        [
            !self.prd.is_empty(),
            !self.prfaq.is_empty(),
            !self.strategy.is_empty(),
            !self.tickets.is_empty(),
        ]
        .into_iter()
        .filter(|non_empty| *non_empty)
        .count()
    }

    pub fn slot_counts(&self) -> SlotCounts {
        SlotCounts {
            prd: self.prd.len(),
            prfaq: self.prfaq.len(),
            strategy: self.strategy.len(),
            tickets: self.tickets.len(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Section counts per slot, for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCounts {
    pub prd: usize,
    pub prfaq: usize,
    pub strategy: usize,
    pub tickets: usize,
}

/// Bucket a change set entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeScope {
    Prd,
    Prfaq,
    Strategy,
    Generic,
    Tickets,
}

impl fmt::Display for ChangeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeScope::Prd => "prd",
            ChangeScope::Prfaq => "prfaq",
            ChangeScope::Strategy => "strategy",
            ChangeScope::Generic => "generic",
            ChangeScope::Tickets => "tickets",
        };
        write!(f, "{}", name)
    }
}

impl From<DocumentType> for ChangeScope {
    fn from(doc_type: DocumentType) -> Self {
        match doc_type {
            DocumentType::Prd => ChangeScope::Prd,
            DocumentType::Prfaq => ChangeScope::Prfaq,
            DocumentType::Strategy => ChangeScope::Strategy,
            DocumentType::Generic => ChangeScope::Generic,
        }
    }
}

/// Added, modified and removed section names for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionChanges {
    #[serde(default)]
    pub added: BTreeSet<String>,
    #[serde(default)]
    pub modified: BTreeSet<String>,
    #[serde(default)]
    pub removed: BTreeSet<String>,
}

impl SectionChanges {
    pub fn added<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            added: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn modified<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modified: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn removed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            removed: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}

/// Normalized diff produced from a webhook or a content comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<ChangeScope, SectionChanges>);

impl ChangeSet {
    pub fn single(scope: ChangeScope, changes: SectionChanges) -> Self {
        let mut set = Self::default();
        set.0.insert(scope, changes);
        set
    }

    pub fn get(&self, scope: ChangeScope) -> Option<&SectionChanges> {
        self.0.get(&scope)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ChangeScope> {
        self.0.keys()
    }

    /// True when no scope carries an addition, modification or removal.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(SectionChanges::is_empty)
    }

    /// Empty and absent change sets mean the same thing to callers.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Priority (or impact) of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::from(s.as_str())
    }
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "critical" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

impl Priority {
    /// Returns an emoji representation of the priority.
    pub fn emoji(&self) -> &'static str {
        match self {
            Priority::Low => "🟢",
            Priority::Medium => "🟡",
            Priority::High => "🔴",
        }
    }
}

/// What a suggestion asks the reader to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Create,
    Update,
    #[default]
    Review,
    Remove,
    Other(String),
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "create" => Action::Create,
            "update" => Action::Update,
            "review" => Action::Review,
            "remove" => Action::Remove,
            other => Action::Other(other.to_string()),
        }
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Action::from(s.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Review => write!(f, "review"),
            Action::Remove => write!(f, "remove"),
            Action::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A cross-document inconsistency reported by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Misalignment {
    #[serde(default, deserialize_with = "null_default")]
    pub issue: String,
    /// `[source, target]` document types.
    #[serde(default, deserialize_with = "string_or_list")]
    pub documents: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub impact: Priority,
    #[serde(default, deserialize_with = "null_default")]
    pub suggestion: String,
}

/// A remediation suggestion reported by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_default")]
    pub action: Action,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "null_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_default")]
    pub target: String,
}

/// The structured analysis extracted from a generation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    /// 1 to 10.
    #[serde(default = "default_score", deserialize_with = "lenient_score")]
    pub alignment_score: u8,
    #[serde(default, deserialize_with = "null_default")]
    pub critical_misalignments: Vec<Misalignment>,
    #[serde(default, deserialize_with = "null_default")]
    pub suggestions: Vec<Suggestion>,
    #[serde(default, deserialize_with = "null_default")]
    pub overall_assessment: String,
}

fn default_score() -> u8 {
    5
}

/// Accepts integers, floats and numeric strings; clamps into 1..=10.
fn lenient_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let score = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    Ok(score
        .filter(|s| s.is_finite())
        .map(|s| s.round().clamp(1.0, 10.0) as u8)
        .unwrap_or_else(default_score))
}

/// Treats an explicit `null` like a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    })
}

impl AnalysisPayload {
    /// Used when a response holds no parseable JSON object.
    pub fn minimal() -> Self {
        Self {
            alignment_score: 5,
            critical_misalignments: Vec::new(),
            suggestions: Vec::new(),
            overall_assessment: "Alignment analysis completed with basic processing.".to_string(),
        }
    }

    /// Used when no generation call succeeded at all.
    pub fn fallback() -> Self {
        Self {
            alignment_score: 5,
            critical_misalignments: Vec::new(),
            suggestions: vec![Suggestion {
                kind: "general".to_string(),
                action: Action::Review,
                description: "Review all documents for consistency and alignment".to_string(),
                priority: Priority::Medium,
                source: "all".to_string(),
                target: "all".to_string(),
            }],
            overall_assessment:
                "Basic alignment check completed. Consider manual review of document consistency."
                    .to_string(),
        }
    }
}

/// How the pipeline arrived at its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    Simple,
    SelfCritique,
    SimpleFallback,
    Fallback,
}

impl fmt::Display for ProcessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMethod::Simple => write!(f, "simple"),
            ProcessingMethod::SelfCritique => write!(f, "self_critique"),
            ProcessingMethod::SimpleFallback => write!(f, "simple_fallback"),
            ProcessingMethod::Fallback => write!(f, "fallback"),
        }
    }
}

/// Advisory note that a single document looks under-specified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementHint {
    pub document_type: DocumentType,
    pub suggestion: String,
    pub priority: Priority,
}

/// Raw texts of the three self-critique steps, kept for auditing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDetails {
    pub initial_response: String,
    pub critique: String,
    pub enhanced_response: String,
}

/// Result of one pipeline run. Always well-shaped, however degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub analysis: AnalysisPayload,
    pub processing_method: ProcessingMethod,
    /// Calls attempted, not calls that produced usable output.
    pub api_calls_used: u32,
    #[serde(default)]
    pub enhancement_suggestions: Vec<EnhancementHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_details: Option<ProcessDetails>,
}

impl AlignmentResult {
    pub fn fallback() -> Self {
        Self {
            analysis: AnalysisPayload::fallback(),
            processing_method: ProcessingMethod::Fallback,
            api_calls_used: 0,
            enhancement_suggestions: Vec::new(),
            process_details: None,
        }
    }

    /// True when the run did not complete the path it selected.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self.processing_method,
            ProcessingMethod::SimpleFallback | ProcessingMethod::Fallback
        )
    }
}

/// Summary of suggestions in an analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Suggestions grouped by their `type` field.
    pub by_type: HashMap<String, usize>,
}

impl SuggestionSummary {
    pub fn from_suggestions(suggestions: &[Suggestion]) -> Self {
        let mut summary = Self {
            total: suggestions.len(),
            ..Self::default()
        };

        for suggestion in suggestions {
            match suggestion.priority {
                Priority::High => summary.high += 1,
                Priority::Medium => summary.medium += 1,
                Priority::Low => summary.low += 1,
            }

            let kind = if suggestion.kind.is_empty() {
                "general".to_string()
            } else {
                suggestion.kind.clone()
            };
            *summary.by_type.entry(kind).or_insert(0) += 1;
        }

        summary
    }
}
