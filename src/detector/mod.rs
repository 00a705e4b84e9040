//! Change detection.
//!
//! Turns a source-specific webhook payload into a normalized
//! [`ChangeSet`]. Ticket and wiki sources normalize their own payloads;
//! document updates carry no change semantics, so their sections are
//! diffed against the previous version of the same document.

use crate::models::{
    ChangeScope, ChangeSet, DocumentVersions, SectionChanges, SourceKind, StructuredContent,
};
use crate::sources::{pointer_str, Registry};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ChangeDetector {
    registry: Arc<Registry>,
}

impl ChangeDetector {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Normalize a webhook from `kind`.
    ///
    /// `previous` holds the document versions of the last stored run;
    /// document updates are diffed against the entry with the same id.
    /// Returns `None` when the payload cannot be attributed or nothing changed.
    pub async fn handle_update(
        &self,
        kind: SourceKind,
        payload: &Value,
        previous: Option<&DocumentVersions>,
    ) -> Option<ChangeSet> {
        let Some(connector) = self.registry.get(kind) else {
            warn!("{} integration not set up", kind);
            return None;
        };

        let changes = match kind {
            SourceKind::GoogleDocs => self.diff_document(payload, previous).await,
            SourceKind::Jira | SourceKind::Linear | SourceKind::Confluence => {
                connector.process_webhook(payload).await
            }
        };

        match changes.and_then(ChangeSet::non_empty) {
            Some(changes) => {
                debug!("{} update touches {:?}", kind, changes.scopes().collect::<Vec<_>>());
                Some(changes)
            }
            None => {
                debug!("{} update carries no changes", kind);
                None
            }
        }
    }

    pub async fn handle_docs_update(
        &self,
        payload: &Value,
        previous: Option<&DocumentVersions>,
    ) -> Option<ChangeSet> {
        self.handle_update(SourceKind::GoogleDocs, payload, previous)
            .await
    }

    pub async fn handle_jira_update(&self, payload: &Value) -> Option<ChangeSet> {
        self.handle_update(SourceKind::Jira, payload, None).await
    }

    pub async fn handle_linear_update(&self, payload: &Value) -> Option<ChangeSet> {
        self.handle_update(SourceKind::Linear, payload, None).await
    }

    pub async fn handle_confluence_update(&self, payload: &Value) -> Option<ChangeSet> {
        self.handle_update(SourceKind::Confluence, payload, None)
            .await
    }

    async fn diff_document(
        &self,
        payload: &Value,
        previous: Option<&DocumentVersions>,
    ) -> Option<ChangeSet> {
        let connector = self.registry.get(SourceKind::GoogleDocs)?;
        let doc_id = pointer_str(payload, "/documentId")?;

        let item = match connector.get_item(doc_id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                debug!("Document {} is not connected", doc_id);
                return None;
            }
            Err(e) => {
                warn!("Failed to look up document {}: {}", doc_id, e);
                return None;
            }
        };
        let doc_type = item.document_type?;

        let current = match connector.get_content(doc_id).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to fetch document {}: {}", doc_id, e);
                return None;
            }
        };

        let previous = previous.and_then(|versions| versions.get(doc_id));
        ChangeSet::single(ChangeScope::from(doc_type), diff_sections(previous, &current))
            .non_empty()
    }
}

/// Section-level diff. With no previous version every section is added.
pub fn diff_sections(
    previous: Option<&StructuredContent>,
    current: &StructuredContent,
) -> SectionChanges {
    let Some(previous) = previous else {
        return SectionChanges::added(current.keys().cloned());
    };

    let mut changes = SectionChanges::default();
    for (section, value) in current {
        match previous.get(section) {
            None => {
                changes.added.insert(section.clone());
            }
            Some(old) if old != value => {
                changes.modified.insert(section.clone());
            }
            Some(_) => {}
        }
    }

    changes.removed = previous
        .keys()
        .filter(|section| !current.contains_key(*section))
        .cloned()
        .collect();

    changes
}
