//! Aggregate-then-analyze orchestration.
//!
//! A run is started by a manual update, a new connection or a webhook. Runs
//! are serialized: the store sits behind the run lock, so two webhooks
//! arriving together are detected and analyzed one after the other.

use crate::aggregator::ContentAggregator;
use crate::detector::ChangeDetector;
use crate::models::{ChangeSet, SlotCounts, SourceKind};
use crate::pipeline::AlignmentPipeline;
use crate::sources::Registry;
use crate::store::{AnalysisRecord, AnalysisStore, StoreError, Trigger};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("webhook payload has no 'source' field")]
    MissingSource,

    #[error("unknown source kind '{0}'")]
    UnknownSource(String),

    #[error(
        "insufficient content for alignment analysis: {found} document type(s) connected, at least {required} required"
    )]
    InsufficientContent { found: usize, required: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of handling one webhook.
#[derive(Debug)]
pub enum WebhookOutcome {
    NoChanges,
    Analyzed {
        changes: ChangeSet,
        record: AnalysisRecord,
    },
}

/// Number of past runs `status` reports.
pub const STATUS_HISTORY: usize = 5;

/// Connected content and the most recent runs.
#[derive(Debug)]
pub struct SyncStatus {
    pub counts: SlotCounts,
    pub non_empty_slots: usize,
    /// Oldest first; the last entry is the latest run.
    pub recent: Vec<AnalysisRecord>,
}

impl SyncStatus {
    pub fn latest(&self) -> Option<&AnalysisRecord> {
        self.recent.last()
    }
}

pub struct SyncService {
    aggregator: ContentAggregator,
    detector: ChangeDetector,
    pipeline: AlignmentPipeline,
    /// Also the run lock: held for the whole of every run.
    store: Mutex<Box<dyn AnalysisStore>>,
    min_document_types: usize,
}

impl SyncService {
    pub fn new(
        registry: Arc<Registry>,
        pipeline: AlignmentPipeline,
        store: Box<dyn AnalysisStore>,
    ) -> Self {
        let min_document_types = pipeline.settings().min_document_types;
        Self {
            aggregator: ContentAggregator::new(registry.clone()),
            detector: ChangeDetector::new(registry),
            pipeline,
            store: Mutex::new(store),
            min_document_types,
        }
    }

    /// Analyze on request. Refused when too few slots hold content.
    pub async fn manual_update(&self) -> Result<AnalysisRecord, SyncError> {
        let mut store = self.store.lock().await;
        self.run(&mut **store, Trigger::Manual, true).await
    }

    /// Analyze after a source was connected.
    pub async fn on_connected(&self, kind: SourceKind) -> Result<AnalysisRecord, SyncError> {
        let mut store = self.store.lock().await;
        self.run(&mut **store, Trigger::Connection(kind), false).await
    }

    /// Route a webhook by its `source` field; analyze only when it carries changes.
    ///
    /// The run lock covers detection and analysis, so the baseline cannot
    /// go stale between the two.
    pub async fn handle_webhook(&self, payload: &Value) -> Result<WebhookOutcome, SyncError> {
        let source = payload
            .get("source")
            .and_then(Value::as_str)
            .ok_or(SyncError::MissingSource)?;
        let kind: SourceKind = source
            .parse()
            .map_err(|_| SyncError::UnknownSource(source.to_string()))?;

        let mut store = self.store.lock().await;
        let previous = store.latest()?.map(|record| record.documents);

        let Some(changes) = self
            .detector
            .handle_update(kind, payload, previous.as_ref())
            .await
        else {
            info!("{} webhook carries no changes", kind);
            return Ok(WebhookOutcome::NoChanges);
        };

        let record = self.run(&mut **store, Trigger::Webhook(kind), false).await?;
        Ok(WebhookOutcome::Analyzed { changes, record })
    }

    /// Snapshot JSON without any generation calls.
    pub async fn collect(&self) -> serde_json::Result<String> {
        self.aggregator.collect_all_content_json().await
    }

    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        let snapshot = self.aggregator.collect_all_content().await;
        let recent = self.store.lock().await.history(STATUS_HISTORY)?;
        Ok(SyncStatus {
            counts: snapshot.slot_counts(),
            non_empty_slots: snapshot.non_empty_slots(),
            recent,
        })
    }

    /// One aggregate-then-analyze run. Callers hold the run lock.
    async fn run(
        &self,
        store: &mut dyn AnalysisStore,
        trigger: Trigger,
        gated: bool,
    ) -> Result<AnalysisRecord, SyncError> {
        info!("Starting alignment run ({})", trigger);

        let (snapshot, documents) = self.aggregator.collect_with_documents().await;

        if gated {
            let found = snapshot.non_empty_slots();
            if found < self.min_document_types {
                return Err(SyncError::InsufficientContent {
                    found,
                    required: self.min_document_types,
                });
            }
        }

        let result = self.pipeline.analyze(&snapshot).await;
        debug!(
            "Run finished: {} with {} API call(s)",
            result.processing_method, result.api_calls_used
        );

        let record = AnalysisRecord::new(trigger, snapshot, result).with_documents(documents);
        store.append(&record)?;
        Ok(record)
    }
}
