//! Wiki connector.
//!
//! Pages carry labels and already-structured content. Pages labelled
//! `strategy` are merged into the strategy slot by the aggregator.

use super::workspace::{WikiPage, WikiStore};
use super::{pointer_str, Connector, Item, ItemFilter, SourceError};
use crate::models::{ChangeScope, ChangeSet, SectionChanges, SourceKind, StructuredContent};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

pub const STRATEGY_LABEL: &str = "strategy";

pub struct ConfluenceConnector {
    store: WikiStore,
}

impl ConfluenceConnector {
    pub fn new(store: WikiStore) -> Self {
        Self { store }
    }

    fn item(&self, page: &WikiPage) -> Item {
        let connected_at = self
            .store
            .connected
            .iter()
            .find(|c| c.id == page.id)
            .map(|c| c.connected_at);

        Item {
            id: page.id.clone(),
            title: page.title.clone(),
            document_type: None,
            labels: page.labels.clone(),
            connected_at,
        }
    }
}

#[async_trait]
impl Connector for ConfluenceConnector {
    fn kind(&self) -> SourceKind {
        SourceKind::Confluence
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, SourceError> {
        Ok(self
            .store
            .connected
            .iter()
            .filter_map(|c| self.store.find(&c.id))
            .map(|page| self.item(page))
            .filter(|item| filter.matches(item))
            .collect())
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>, SourceError> {
        Ok(self.store.find(id).map(|page| self.item(page)))
    }

    async fn get_content(&self, id: &str) -> Result<StructuredContent, SourceError> {
        self.store
            .find(id)
            .map(|page| page.content.clone())
            .ok_or_else(|| SourceError::NotFound {
                kind: SourceKind::Confluence,
                id: id.to_string(),
            })
    }

    async fn process_webhook(&self, payload: &Value) -> Option<ChangeSet> {
        let Some(page_id) = pointer_str(payload, "/page/id") else {
            warn!("No page id in webhook payload");
            return None;
        };
        let Some(page) = self.store.find(page_id) else {
            warn!("Page {} not found", page_id);
            return None;
        };

        let scope = if page.labels.iter().any(|l| l == STRATEGY_LABEL) {
            ChangeScope::Strategy
        } else {
            ChangeScope::Generic
        };
        let sections = page.content.keys().cloned();

        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let changes = match event {
            "page_created" => SectionChanges::added(sections),
            "page_updated" => SectionChanges::modified(sections),
            "page_removed" => SectionChanges::removed(sections),
            other => {
                info!("Ignoring webhook event {}", other);
                return None;
            }
        };

        ChangeSet::single(scope, changes).non_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Workspace;
    use serde_json::json;

    fn connector() -> ConfluenceConnector {
        let mut ws = Workspace::default();
        ws.confluence.pages = vec![
            WikiPage {
                id: "page1".to_string(),
                title: "Product Strategy".to_string(),
                labels: vec!["strategy".to_string()],
                content: json!({"vision": "Lead the market", "approach": "Integrations first"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            },
            WikiPage {
                id: "page2".to_string(),
                title: "Technical Architecture".to_string(),
                labels: vec!["architecture".to_string()],
                content: json!({"overview": "Microservices"}).as_object().cloned().unwrap(),
            },
        ];
        ws.connect(SourceKind::Confluence, "page1", None).unwrap();
        ws.connect(SourceKind::Confluence, "page2", None).unwrap();
        ConfluenceConnector::new(ws.confluence)
    }

    #[tokio::test]
    async fn test_list_items_by_label() {
        let items = connector()
            .list_items(&ItemFilter::label(STRATEGY_LABEL))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "page1");
        assert!(items[0].connected_at.is_some());
    }

    #[tokio::test]
    async fn test_webhook_scope_follows_labels() {
        let connector = connector();

        let changes = connector
            .process_webhook(&json!({"event": "page_updated", "page": {"id": "page1"}}))
            .await
            .unwrap();
        let strategy = changes.get(ChangeScope::Strategy).unwrap();
        assert_eq!(strategy.modified.len(), 2);

        let changes = connector
            .process_webhook(&json!({"event": "page_created", "page": {"id": "page2"}}))
            .await
            .unwrap();
        assert!(changes.get(ChangeScope::Generic).unwrap().added.contains("overview"));
    }

    #[tokio::test]
    async fn test_webhook_unknown_page_or_event() {
        let connector = connector();
        assert!(connector
            .process_webhook(&json!({"event": "page_updated", "page": {}}))
            .await
            .is_none());
        assert!(connector
            .process_webhook(&json!({"event": "page_updated", "page": {"id": "page9"}}))
            .await
            .is_none());
        assert!(connector
            .process_webhook(&json!({"event": "page_moved", "page": {"id": "page1"}}))
            .await
            .is_none());
    }
}
