//! Source connectors.
//!
//! Every connected system (document editor, issue trackers, wiki) is
//! reached through the [`Connector`] trait. Connectors are collected in a
//! [`Registry`] that is handed to the aggregator and the change detector,
//! so tests can swap in fakes without touching any global state.

mod confluence;
mod extractor;
mod google_docs;
mod jira;
mod linear;
mod workspace;

pub use confluence::{ConfluenceConnector, STRATEGY_LABEL};
pub use extractor::HeadingExtractor;
pub use google_docs::GoogleDocsConnector;
pub use jira::JiraConnector;
pub use linear::LinearConnector;
pub use workspace::Workspace;

use crate::models::{ChangeSet, DocumentType, SourceKind, SourceRole, StructuredContent, Ticket};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by connectors.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{kind} has no item with id '{id}'")]
    NotFound { kind: SourceKind, id: String },

    #[error("Failed to access workspace file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid workspace file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A connected item (document, project or page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Declared type; only document sources set this.
    #[serde(default)]
    pub document_type: Option<DocumentType>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub connected_at: Option<DateTime<Utc>>,
}

/// Narrows `list_items` results.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub label: Option<String>,
}

impl ItemFilter {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        match &self.label {
            Some(label) => item.labels.iter().any(|l| l == label),
            None => true,
        }
    }
}

/// Capability every source exposes.
#[async_trait]
pub trait Connector: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Connected items, in connection order.
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, SourceError>;

    async fn get_item(&self, id: &str) -> Result<Option<Item>, SourceError>;

    async fn get_content(&self, id: &str) -> Result<StructuredContent, SourceError>;

    /// Tickets from every connected project. Non-ticket sources have none.
    async fn get_tickets(&self) -> Result<Vec<Ticket>, SourceError> {
        Ok(Vec::new())
    }

    /// Normalize a native webhook payload. `None` means nothing attributable changed.
    async fn process_webhook(&self, payload: &Value) -> Option<ChangeSet>;
}

/// Connectors in registration order.
#[derive(Clone, Default)]
pub struct Registry {
    connectors: Vec<Arc<dyn Connector>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.push(connector);
    }

    pub fn with(mut self, connector: Arc<dyn Connector>) -> Self {
        self.register(connector);
        self
    }

    /// First connector registered for `kind`.
    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn Connector>> {
        self.connectors.iter().find(|c| c.kind() == kind)
    }

    pub fn by_role(&self, role: SourceRole) -> impl Iterator<Item = &Arc<dyn Connector>> {
        self.connectors
            .iter()
            .filter(move |c| c.kind().role() == role)
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.connectors.iter().map(|c| c.kind()))
            .finish()
    }
}

/// Extract a string at a JSON pointer, ignoring empty values.
pub(crate) fn pointer_str<'a>(payload: &'a Value, pointer: &str) -> Option<&'a str> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
