//! Issue tracker connector (Jira-style webhooks).

use super::workspace::TicketStore;
use super::{pointer_str, Connector, Item, ItemFilter, SourceError};
use crate::models::{ChangeScope, ChangeSet, SectionChanges, SourceKind, StructuredContent, Ticket};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

pub struct JiraConnector {
    store: TicketStore,
}

impl JiraConnector {
    pub fn new(store: TicketStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Connector for JiraConnector {
    fn kind(&self) -> SourceKind {
        SourceKind::Jira
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, SourceError> {
        Ok(project_items(&self.store, filter))
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>, SourceError> {
        Ok(ticket_item(&self.store, id))
    }

    async fn get_content(&self, id: &str) -> Result<StructuredContent, SourceError> {
        ticket_content(&self.store, SourceKind::Jira, id)
    }

    async fn get_tickets(&self) -> Result<Vec<Ticket>, SourceError> {
        Ok(self.store.connected_tickets())
    }

    async fn process_webhook(&self, payload: &Value) -> Option<ChangeSet> {
        let Some(key) = pointer_str(payload, "/issue/key") else {
            warn!("No issue key in webhook payload");
            return None;
        };

        let event = payload
            .get("webhookEvent")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let changes = match event {
            "jira:issue_created" => SectionChanges::added([key]),
            "jira:issue_updated" => SectionChanges::modified([key]),
            "jira:issue_deleted" => SectionChanges::removed([key]),
            other => {
                info!("Ignoring webhook event {}", other);
                return None;
            }
        };

        ChangeSet::single(ChangeScope::Tickets, changes).non_empty()
    }
}

/// Connected projects as items.
pub(super) fn project_items(store: &TicketStore, filter: &ItemFilter) -> Vec<Item> {
    store
        .connected
        .iter()
        .map(|c| Item {
            id: c.id.clone(),
            title: c.id.clone(),
            document_type: None,
            labels: Vec::new(),
            connected_at: Some(c.connected_at),
        })
        .filter(|item| filter.matches(item))
        .collect()
}

pub(super) fn ticket_item(store: &TicketStore, id: &str) -> Option<Item> {
    store.find(id).map(|t| Item {
        id: t.id.clone(),
        title: t.title.clone(),
        document_type: None,
        labels: Vec::new(),
        connected_at: None,
    })
}

/// A single ticket rendered as sections.
pub(super) fn ticket_content(
    store: &TicketStore,
    kind: SourceKind,
    id: &str,
) -> Result<StructuredContent, SourceError> {
    let ticket = store.find(id).ok_or_else(|| SourceError::NotFound {
        kind,
        id: id.to_string(),
    })?;

    match serde_json::to_value(ticket) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Ok(StructuredContent::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Workspace;
    use serde_json::json;

    fn connector() -> JiraConnector {
        let mut ws = Workspace::default();
        ws.jira.tickets = ["PROJ-1", "PROJ-2", "OPS-7"]
            .iter()
            .map(|id| Ticket {
                id: id.to_string(),
                title: format!("Ticket {}", id),
                ..Ticket::default()
            })
            .collect();
        ws.connect(SourceKind::Jira, "PROJ", None).unwrap();
        JiraConnector::new(ws.jira)
    }

    #[tokio::test]
    async fn test_tickets_of_connected_projects() {
        let tickets = connector().get_tickets().await.unwrap();
        let ids: Vec<_> = tickets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["PROJ-1", "PROJ-2"]);
    }

    #[tokio::test]
    async fn test_ticket_content() {
        let content = connector().get_content("OPS-7").await.unwrap();
        assert_eq!(content["title"], "Ticket OPS-7");
        assert!(connector().get_content("OPS-8").await.is_err());
    }

    #[tokio::test]
    async fn test_webhook_events() {
        let connector = connector();

        let created = connector
            .process_webhook(&json!({"webhookEvent": "jira:issue_created", "issue": {"key": "PROJ-9"}}))
            .await
            .unwrap();
        assert!(created.get(ChangeScope::Tickets).unwrap().added.contains("PROJ-9"));

        let deleted = connector
            .process_webhook(&json!({"webhookEvent": "jira:issue_deleted", "issue": {"key": "PROJ-1"}}))
            .await
            .unwrap();
        assert!(deleted.get(ChangeScope::Tickets).unwrap().removed.contains("PROJ-1"));
    }

    #[tokio::test]
    async fn test_webhook_without_key_or_known_event() {
        let connector = connector();
        assert!(connector
            .process_webhook(&json!({"webhookEvent": "jira:issue_created", "issue": {}}))
            .await
            .is_none());
        assert!(connector
            .process_webhook(&json!({"webhookEvent": "sprint_started", "issue": {"key": "PROJ-1"}}))
            .await
            .is_none());
    }
}
