//! Content aggregation.
//!
//! Builds the [`UnifiedSnapshot`] from every registered connector:
//! typed documents first, then ticket backlogs, then wiki pages labelled
//! `strategy`. A failing connector contributes nothing and never aborts
//! the run.

mod merge;

pub use merge::merge_content;

use crate::models::{
    DocumentType, DocumentVersions, SourceRole, StructuredContent, UnifiedSnapshot,
};
use crate::sources::{Connector, ItemFilter, Registry, SourceError, STRATEGY_LABEL};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collects content from all connected sources into one snapshot.
pub struct ContentAggregator {
    registry: Arc<Registry>,
}

impl ContentAggregator {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Aggregate every source into a fresh snapshot.
    pub async fn collect_all_content(&self) -> UnifiedSnapshot {
        self.collect_with_documents().await.0
    }

    /// Aggregate, also returning each document's own content.
    ///
    /// Slots hold merged or overwritten content, so document diffs need
    /// the per-document versions.
    pub async fn collect_with_documents(&self) -> (UnifiedSnapshot, DocumentVersions) {
        let mut snapshot = UnifiedSnapshot::default();
        let mut versions = DocumentVersions::new();

        for connector in self.registry.by_role(SourceRole::Documents) {
            match collect_documents(connector.as_ref()).await {
                Ok(documents) => {
                    for (id, doc_type, content) in documents {
                        versions.insert(id.clone(), content.clone());
                        route_document(&mut snapshot, &id, doc_type, content);
                    }
                }
                Err(e) => warn!("Skipping {}: {}", connector.kind(), e),
            }
        }

        for connector in self.registry.by_role(SourceRole::Tickets) {
            match connector.get_tickets().await {
                Ok(tickets) => {
                    debug!("Collected {} tickets from {}", tickets.len(), connector.kind());
                    snapshot.tickets.extend(tickets);
                }
                Err(e) => warn!("Skipping {}: {}", connector.kind(), e),
            }
        }

        for connector in self.registry.by_role(SourceRole::Wiki) {
            match collect_strategy_pages(connector.as_ref()).await {
                Ok(pages) => {
                    for page in &pages {
                        merge_content(&mut snapshot.strategy, page);
                    }
                }
                Err(e) => warn!("Skipping {}: {}", connector.kind(), e),
            }
        }

        info!(
            "Collected snapshot: {} sections across {} slots",
            snapshot.total_sections(),
            snapshot.non_empty_slots()
        );
        (snapshot, versions)
    }

    /// Aggregate and serialize, the reference format for persistence and prompts.
    pub async fn collect_all_content_json(&self) -> serde_json::Result<String> {
        self.collect_all_content().await.to_json()
    }
}

/// Fetch every connected document of one source. Any failure discards the whole source.
async fn collect_documents(
    connector: &dyn Connector,
) -> Result<Vec<(String, DocumentType, StructuredContent)>, SourceError> {
    let mut documents = Vec::new();

    for item in connector.list_items(&ItemFilter::default()).await? {
        let doc_type = item.document_type.unwrap_or(DocumentType::Generic);
        let content = connector.get_content(&item.id).await?;
        documents.push((item.id, doc_type, content));
    }

    Ok(documents)
}

async fn collect_strategy_pages(
    connector: &dyn Connector,
) -> Result<Vec<StructuredContent>, SourceError> {
    let mut pages = Vec::new();

    for item in connector.list_items(&ItemFilter::label(STRATEGY_LABEL)).await? {
        pages.push(connector.get_content(&item.id).await?);
    }

    Ok(pages)
}

/// Replace the slot for `doc_type`. The last document of a type wins.
fn route_document(
    snapshot: &mut UnifiedSnapshot,
    id: &str,
    doc_type: DocumentType,
    content: StructuredContent,
) {
    if content.is_empty() {
        debug!("Document {} has no sections", id);
        return;
    }

    match snapshot.slot_mut(doc_type) {
        Some(slot) => {
            if !slot.is_empty() {
                warn!("Document {} replaces earlier {} content", id, doc_type);
            }
            *slot = content;
        }
        None => debug!("Document {} has type {}, not aggregated", id, doc_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use crate::sources::testing::FakeConnector;
    use serde_json::json;

    fn aggregator(registry: Registry) -> ContentAggregator {
        ContentAggregator::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_empty_registry_gives_empty_snapshot() {
        let snapshot = aggregator(Registry::new()).collect_all_content().await;
        assert_eq!(snapshot, UnifiedSnapshot::default());
    }

    #[tokio::test]
    async fn test_documents_route_by_type() {
        let docs = FakeConnector::new(SourceKind::GoogleDocs)
            .document("doc-prd", DocumentType::Prd, &[], json!({"overview": "o", "solution": "s"}))
            .document("doc-faq", DocumentType::Prfaq, &[], json!({"press_release": "p"}))
            .document("doc-misc", DocumentType::Generic, &[], json!({"notes": "n"}));

        let snapshot = aggregator(Registry::new().with(Arc::new(docs)))
            .collect_all_content()
            .await;

        assert_eq!(snapshot.prd.len(), 2);
        assert_eq!(snapshot.prfaq["press_release"], "p");
        assert!(snapshot.strategy.is_empty());
    }

    #[tokio::test]
    async fn test_last_document_of_a_type_wins() {
        let docs = FakeConnector::new(SourceKind::GoogleDocs)
            .document("prd-1", DocumentType::Prd, &[], json!({"overview": "first"}))
            .document("prd-2", DocumentType::Prd, &[], json!({"goals": "second"}))
            .document("prd-3", DocumentType::Prd, &[], json!({}));

        let snapshot = aggregator(Registry::new().with(Arc::new(docs)))
            .collect_all_content()
            .await;

        assert_eq!(snapshot.prd.len(), 1);
        assert_eq!(snapshot.prd["goals"], "second");
    }

    #[tokio::test]
    async fn test_tickets_keep_source_and_item_order() {
        let jira = FakeConnector::new(SourceKind::Jira)
            .ticket("PROJ-1")
            .ticket("PROJ-2")
            .ticket("PROJ-3");
        let linear = FakeConnector::new(SourceKind::Linear)
            .ticket("LIN-1")
            .ticket("LIN-2");

        let snapshot = aggregator(Registry::new().with(Arc::new(jira)).with(Arc::new(linear)))
            .collect_all_content()
            .await;

        let ids: Vec<_> = snapshot.tickets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["PROJ-1", "PROJ-2", "PROJ-3", "LIN-1", "LIN-2"]);
    }

    #[tokio::test]
    async fn test_duplicate_ticket_ids_are_kept() {
        let jira = FakeConnector::new(SourceKind::Jira).ticket("X-1");
        let linear = FakeConnector::new(SourceKind::Linear).ticket("X-1");

        let snapshot = aggregator(Registry::new().with(Arc::new(jira)).with(Arc::new(linear)))
            .collect_all_content()
            .await;

        assert_eq!(snapshot.tickets.len(), 2);
    }

    #[tokio::test]
    async fn test_wiki_strategy_pages_merge_over_document() {
        let docs = FakeConnector::new(SourceKind::GoogleDocs).document(
            "q3-strategy",
            DocumentType::Strategy,
            &[],
            json!({"vision": "doc vision", "approach": "doc approach"}),
        );
        let wiki = FakeConnector::new(SourceKind::Confluence)
            .document(
                "page1",
                DocumentType::Generic,
                &["strategy"],
                json!({"vision": "wiki vision", "business_value": "5h weekly"}),
            )
            .document(
                "page2",
                DocumentType::Generic,
                &["architecture"],
                json!({"overview": "microservices"}),
            );

        let snapshot = aggregator(Registry::new().with(Arc::new(docs)).with(Arc::new(wiki)))
            .collect_all_content()
            .await;

        assert_eq!(snapshot.strategy.len(), 3);
        assert_eq!(snapshot.strategy["vision"], "wiki vision");
        assert_eq!(snapshot.strategy["approach"], "doc approach");
        assert!(!snapshot.strategy.contains_key("overview"));
    }

    #[tokio::test]
    async fn test_document_versions_are_unmerged() {
        let docs = FakeConnector::new(SourceKind::GoogleDocs)
            .document("prd-1", DocumentType::Prd, &[], json!({"overview": "first"}))
            .document("prd-2", DocumentType::Prd, &[], json!({"goals": "second"}))
            .document("q3-strategy", DocumentType::Strategy, &[], json!({"vision": "doc vision"}));
        let wiki = FakeConnector::new(SourceKind::Confluence).document(
            "page1",
            DocumentType::Generic,
            &["strategy"],
            json!({"vision": "wiki vision"}),
        );

        let (snapshot, versions) =
            aggregator(Registry::new().with(Arc::new(docs)).with(Arc::new(wiki)))
                .collect_with_documents()
                .await;

        assert_eq!(snapshot.strategy["vision"], "wiki vision");
        assert_eq!(versions.len(), 3);
        assert_eq!(versions["prd-1"]["overview"], "first");
        assert_eq!(versions["q3-strategy"]["vision"], "doc vision");
        assert!(!versions.contains_key("page1"));
    }

    #[tokio::test]
    async fn test_failing_source_contributes_nothing() {
        let docs = FakeConnector::failing(SourceKind::GoogleDocs);
        let jira = FakeConnector::new(SourceKind::Jira).ticket("PROJ-1");
        let wiki = FakeConnector::failing(SourceKind::Confluence);
        let linear = FakeConnector::new(SourceKind::Linear).ticket("LIN-1");

        let registry = Registry::new()
            .with(Arc::new(docs))
            .with(Arc::new(jira))
            .with(Arc::new(linear))
            .with(Arc::new(wiki));
        let snapshot = aggregator(registry).collect_all_content().await;

        assert_eq!(snapshot.tickets.len(), 2);
        assert!(snapshot.prd.is_empty());
        assert!(snapshot.strategy.is_empty());
    }

    #[tokio::test]
    async fn test_partial_document_failure_discards_the_source() {
        let mut docs = FakeConnector::new(SourceKind::GoogleDocs)
            .document("prd-1", DocumentType::Prd, &[], json!({"overview": "o"}))
            .document("faq-1", DocumentType::Prfaq, &[], json!({"press_release": "p"}));
        docs.content.remove("faq-1");

        let snapshot = aggregator(Registry::new().with(Arc::new(docs)))
            .collect_all_content()
            .await;

        assert!(snapshot.prd.is_empty());
        assert!(snapshot.prfaq.is_empty());
    }

    #[tokio::test]
    async fn test_collect_json_uses_snapshot_field_names() {
        let jira = FakeConnector::new(SourceKind::Jira).ticket("PROJ-1");
        let json = aggregator(Registry::new().with(Arc::new(jira)))
            .collect_all_content_json()
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tickets"][0]["id"], "PROJ-1");
        assert_eq!(value["prd"], json!({}));
    }
}
