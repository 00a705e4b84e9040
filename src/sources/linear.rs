//! Issue tracker connector (Linear-style webhooks).

use super::jira::{project_items, ticket_content, ticket_item};
use super::workspace::TicketStore;
use super::{pointer_str, Connector, Item, ItemFilter, SourceError};
use crate::models::{ChangeScope, ChangeSet, SectionChanges, SourceKind, StructuredContent, Ticket};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

pub struct LinearConnector {
    store: TicketStore,
}

impl LinearConnector {
    pub fn new(store: TicketStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Connector for LinearConnector {
    fn kind(&self) -> SourceKind {
        SourceKind::Linear
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, SourceError> {
        Ok(project_items(&self.store, filter))
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>, SourceError> {
        Ok(ticket_item(&self.store, id))
    }

    async fn get_content(&self, id: &str) -> Result<StructuredContent, SourceError> {
        ticket_content(&self.store, SourceKind::Linear, id)
    }

    async fn get_tickets(&self) -> Result<Vec<Ticket>, SourceError> {
        Ok(self.store.connected_tickets())
    }

    async fn process_webhook(&self, payload: &Value) -> Option<ChangeSet> {
        let Some(id) = pointer_str(payload, "/data/id") else {
            warn!("No issue id in webhook payload");
            return None;
        };

        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let changes = match action {
            "create" => SectionChanges::added([id]),
            "update" => SectionChanges::modified([id]),
            "remove" => SectionChanges::removed([id]),
            other => {
                info!("Ignoring webhook action {}", other);
                return None;
            }
        };

        ChangeSet::single(ChangeScope::Tickets, changes).non_empty()
    }
}
