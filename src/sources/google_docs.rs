//! Document editor connector.
//!
//! Serves connected documents with their declared type. Content is the
//! raw body run through the heading extractor. The editor has no native
//! change semantics, so webhooks only identify the document; the change
//! detector diffs the content itself.

use super::workspace::DocumentStore;
use super::{pointer_str, Connector, HeadingExtractor, Item, ItemFilter, SourceError};
use crate::models::{ChangeScope, ChangeSet, SectionChanges, SourceKind, StructuredContent};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

pub struct GoogleDocsConnector {
    store: DocumentStore,
    extractor: HeadingExtractor,
}

impl GoogleDocsConnector {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            extractor: HeadingExtractor::new(),
        }
    }

    fn item(&self, id: &str) -> Option<Item> {
        let connection = self.store.connected.iter().find(|c| c.id == id)?;
        let title = self
            .store
            .documents
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.title.clone())
            .unwrap_or_default();

        Some(Item {
            id: connection.id.clone(),
            title,
            document_type: connection.document_type,
            labels: Vec::new(),
            connected_at: Some(connection.connected_at),
        })
    }
}

#[async_trait]
impl Connector for GoogleDocsConnector {
    fn kind(&self) -> SourceKind {
        SourceKind::GoogleDocs
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, SourceError> {
        Ok(self
            .store
            .connected
            .iter()
            .filter_map(|c| self.item(&c.id))
            .filter(|item| filter.matches(item))
            .collect())
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>, SourceError> {
        Ok(self.item(id))
    }

    async fn get_content(&self, id: &str) -> Result<StructuredContent, SourceError> {
        let document = self
            .store
            .documents
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| SourceError::NotFound {
                kind: SourceKind::GoogleDocs,
                id: id.to_string(),
            })?;

        let content = self.extractor.extract(&document.body);
        debug!("Extracted {} sections from {}", content.len(), id);
        Ok(content)
    }

    /// Reports every current section of the document as modified.
    ///
    /// Used only when a caller bypasses the change detector; the detector
    /// diffs against the previous snapshot instead.
    async fn process_webhook(&self, payload: &Value) -> Option<ChangeSet> {
        let Some(id) = pointer_str(payload, "/documentId") else {
            warn!("No documentId in webhook payload");
            return None;
        };
        let doc_type = self.item(id)?.document_type?;
        let content = self.get_content(id).await.ok()?;

        ChangeSet::single(
            ChangeScope::from(doc_type),
            SectionChanges::modified(content.keys().cloned()),
        )
        .non_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentType;
    use crate::sources::workspace::RawDocument;
    use crate::sources::Workspace;
    use serde_json::json;

    fn connector() -> GoogleDocsConnector {
        let mut ws = Workspace::default();
        ws.google_docs.documents.push(RawDocument {
            id: "q3-strategy".to_string(),
            title: "Strategy Document".to_string(),
            body: "# Strategy Document\n\n## Vision\nSimplify workflows.\n\n## Approach\nAutomate."
                .to_string(),
        });
        ws.google_docs.documents.push(RawDocument {
            id: "unconnected".to_string(),
            ..RawDocument::default()
        });
        ws.connect(SourceKind::GoogleDocs, "q3-strategy", None).unwrap();
        GoogleDocsConnector::new(ws.google_docs)
    }

    #[tokio::test]
    async fn test_lists_only_connected_documents() {
        let items = connector().list_items(&ItemFilter::default()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Strategy Document");
        assert_eq!(items[0].document_type, Some(DocumentType::Strategy));
    }

    #[tokio::test]
    async fn test_get_content_extracts_sections() {
        let content = connector().get_content("q3-strategy").await.unwrap();
        assert_eq!(content["vision"], "Simplify workflows.");
        assert_eq!(content.len(), 3);

        assert!(connector().get_content("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_webhook_requires_document_id() {
        let connector = connector();
        assert!(connector.process_webhook(&json!({})).await.is_none());
        assert!(connector
            .process_webhook(&json!({"documentId": "unconnected"}))
            .await
            .is_none());

        let changes = connector
            .process_webhook(&json!({"documentId": "q3-strategy"}))
            .await
            .unwrap();
        assert_eq!(changes.get(ChangeScope::Strategy).unwrap().modified.len(), 3);
    }
}
