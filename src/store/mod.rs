//! Analysis history.
//!
//! Each aggregate-then-analyze run appends one [`AnalysisRecord`]. The most
//! recent record's document versions are the baseline for section diffing.

use crate::models::{AlignmentResult, DocumentVersions, SourceKind, UnifiedSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access analysis store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize analysis record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "source", rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Webhook(SourceKind),
    Connection(SourceKind),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Manual => write!(f, "manual update"),
            Trigger::Webhook(kind) => write!(f, "{} webhook", kind),
            Trigger::Connection(kind) => write!(f, "new {} connection", kind),
        }
    }
}

/// One persisted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: DateTime<Utc>,
    pub trigger: Trigger,
    pub snapshot: UnifiedSnapshot,
    /// Unmerged content of each aggregated document.
    #[serde(default)]
    pub documents: DocumentVersions,
    pub result: AlignmentResult,
}

impl AnalysisRecord {
    pub fn new(trigger: Trigger, snapshot: UnifiedSnapshot, result: AlignmentResult) -> Self {
        Self {
            timestamp: Utc::now(),
            trigger,
            snapshot,
            documents: DocumentVersions::new(),
            result,
        }
    }

    pub fn with_documents(mut self, documents: DocumentVersions) -> Self {
        self.documents = documents;
        self
    }
}

/// Append-only run history.
pub trait AnalysisStore: Send + Sync {
    fn append(&mut self, record: &AnalysisRecord) -> Result<(), StoreError>;

    fn latest(&self) -> Result<Option<AnalysisRecord>, StoreError>;

    /// Up to `limit` most recent records, oldest first.
    fn history(&self, limit: usize) -> Result<Vec<AnalysisRecord>, StoreError>;
}

/// One JSON record per line.
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_all(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No analysis history at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping unreadable record at {}:{}: {}",
                    self.path.display(),
                    index + 1,
                    e
                ),
            }
        }
        Ok(records)
    }
}

impl AnalysisStore for JsonlStore {
    fn append(&mut self, record: &AnalysisRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.io_error(e))?;

        debug!("Appended analysis record to {}", self.path.display());
        Ok(())
    }

    fn latest(&self) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self.read_all()?.pop())
    }

    fn history(&self, limit: usize) -> Result<Vec<AnalysisRecord>, StoreError> {
        let mut records = self.read_all()?;
        let skip = records.len().saturating_sub(limit);
        Ok(records.split_off(skip))
    }
}

/// In-process history, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<AnalysisRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnalysisStore for MemoryStore {
    fn append(&mut self, record: &AnalysisRecord) -> Result<(), StoreError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn latest(&self) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self.records.last().cloned())
    }

    fn history(&self, limit: usize) -> Result<Vec<AnalysisRecord>, StoreError> {
        let skip = self.records.len().saturating_sub(limit);
        Ok(self.records[skip..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessingMethod;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(trigger: Trigger, score: u8) -> AnalysisRecord {
        let mut result = AlignmentResult::fallback();
        result.analysis.alignment_score = score;
        let snapshot: UnifiedSnapshot =
            serde_json::from_value(json!({"prd": {"overview": "Checkout"}})).unwrap();
        AnalysisRecord::new(trigger, snapshot, result)
    }

    #[test]
    fn test_trigger_serialization() {
        assert_eq!(
            serde_json::to_value(Trigger::Manual).unwrap(),
            json!({"kind": "manual"})
        );
        assert_eq!(
            serde_json::to_value(Trigger::Webhook(SourceKind::Jira)).unwrap(),
            json!({"kind": "webhook", "source": "jira"})
        );
        assert_eq!(
            Trigger::Connection(SourceKind::GoogleDocs).to_string(),
            "new google_docs connection"
        );
    }

    #[test]
    fn test_jsonl_store_appends_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonlStore::new(dir.path().join("history").join("runs.jsonl"));

        assert!(store.latest().unwrap().is_none());

        store.append(&record(Trigger::Manual, 3)).unwrap();
        store
            .append(&record(Trigger::Webhook(SourceKind::Linear), 8))
            .unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 2);

        let latest = store.latest().unwrap().unwrap();
        assert_eq!(latest.trigger, Trigger::Webhook(SourceKind::Linear));
        assert_eq!(latest.result.analysis.alignment_score, 8);
        assert_eq!(latest.result.processing_method, ProcessingMethod::Fallback);
        assert_eq!(latest.snapshot.prd["overview"], "Checkout");
    }

    #[test]
    fn test_jsonl_store_skips_unreadable_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runs.jsonl");
        let mut store = JsonlStore::new(&path);

        store.append(&record(Trigger::Manual, 4)).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{truncated").unwrap();
        store.append(&record(Trigger::Manual, 6)).unwrap();

        let history = store.history(10).unwrap();
        let scores: Vec<_> = history
            .iter()
            .map(|r| r.result.analysis.alignment_score)
            .collect();
        assert_eq!(scores, vec![4, 6]);
    }

    #[test]
    fn test_records_without_documents_still_load() {
        let mut value = serde_json::to_value(record(Trigger::Manual, 7)).unwrap();
        value.as_object_mut().unwrap().remove("documents");

        let loaded: AnalysisRecord = serde_json::from_value(value).unwrap();
        assert!(loaded.documents.is_empty());
        assert_eq!(loaded.result.analysis.alignment_score, 7);
    }

    #[test]
    fn test_history_limit_keeps_most_recent() {
        let mut store = MemoryStore::new();
        for score in 1..=5 {
            store.append(&record(Trigger::Manual, score)).unwrap();
        }

        let scores: Vec<_> = store
            .history(2)
            .unwrap()
            .iter()
            .map(|r| r.result.analysis.alignment_score)
            .collect();
        assert_eq!(scores, vec![4, 5]);
        assert_eq!(store.history(0).unwrap().len(), 0);
        assert_eq!(
            store.latest().unwrap().unwrap().result.analysis.alignment_score,
            5
        );
    }
}
