//! Workspace file backing the connectors.
//!
//! The workspace is a JSON file holding, per source, the content the
//! source can serve and the list of connections the user made. It is the
//! only place connection state lives; connectors are rebuilt from it on
//! every invocation.

use super::{
    ConfluenceConnector, GoogleDocsConnector, JiraConnector, LinearConnector, Registry,
    SourceError,
};
use crate::models::{DocumentType, SourceKind, StructuredContent, Ticket};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A user-made connection to a document, project or page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    pub connected_at: DateTime<Utc>,
}

/// Raw document body as served by the document editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStore {
    #[serde(default)]
    pub documents: Vec<RawDocument>,
    #[serde(default)]
    pub connected: Vec<Connection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketStore {
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    /// Connected project keys; a ticket belongs to a project when its id starts with the key.
    #[serde(default)]
    pub connected: Vec<Connection>,
}

impl TicketStore {
    /// Tickets of the given project, or every ticket when `project` is `None`.
    pub fn project_tickets(&self, project: Option<&str>) -> Vec<Ticket> {
        self.tickets
            .iter()
            .filter(|t| project.map_or(true, |p| t.id.starts_with(p)))
            .cloned()
            .collect()
    }

    /// Tickets of every connected project, project by project.
    pub fn connected_tickets(&self) -> Vec<Ticket> {
        self.connected
            .iter()
            .flat_map(|c| self.project_tickets(Some(&c.id)))
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }
}

/// A wiki page with labels and pre-structured content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WikiPage {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub content: StructuredContent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WikiStore {
    #[serde(default)]
    pub pages: Vec<WikiPage>,
    #[serde(default)]
    pub connected: Vec<Connection>,
}

impl WikiStore {
    pub fn find(&self, id: &str) -> Option<&WikiPage> {
        self.pages.iter().find(|p| p.id == id)
    }
}

/// Connection state and content of every source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub google_docs: DocumentStore,
    #[serde(default)]
    pub jira: TicketStore,
    #[serde(default)]
    pub linear: TicketStore,
    #[serde(default)]
    pub confluence: WikiStore,
}

impl Workspace {
    /// Load a workspace file. A missing file is an empty workspace.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            debug!("No workspace at {}, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SourceError> {
        let content = serde_json::to_string_pretty(self).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        std::fs::write(path, content).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Record a connection. Reconnecting an id replaces its previous connection.
    ///
    /// Documents and pages must exist in the workspace; ticket projects are
    /// accepted as given. A document's type is inferred from its id when
    /// `document_type` is `None`.
    pub fn connect(
        &mut self,
        kind: SourceKind,
        id: &str,
        document_type: Option<DocumentType>,
    ) -> Result<Connection, SourceError> {
        let not_found = || SourceError::NotFound {
            kind,
            id: id.to_string(),
        };

        let (connected, document_type) = match kind {
            SourceKind::GoogleDocs => {
                if !self.google_docs.documents.iter().any(|d| d.id == id) {
                    return Err(not_found());
                }
                let doc_type = document_type.unwrap_or_else(|| DocumentType::infer_from_id(id));
                (&mut self.google_docs.connected, Some(doc_type))
            }
            SourceKind::Jira => (&mut self.jira.connected, None),
            SourceKind::Linear => (&mut self.linear.connected, None),
            SourceKind::Confluence => {
                if self.confluence.find(id).is_none() {
                    return Err(not_found());
                }
                (&mut self.confluence.connected, None)
            }
        };

        let connection = Connection {
            id: id.to_string(),
            document_type,
            connected_at: Utc::now(),
        };

        connected.retain(|c| c.id != id);
        connected.push(connection.clone());

        info!("Connected {} item {}", kind, id);
        Ok(connection)
    }

    /// Connections per source kind.
    pub fn connection_count(&self, kind: SourceKind) -> usize {
        match kind {
            SourceKind::GoogleDocs => self.google_docs.connected.len(),
            SourceKind::Jira => self.jira.connected.len(),
            SourceKind::Linear => self.linear.connected.len(),
            SourceKind::Confluence => self.confluence.connected.len(),
        }
    }

    /// Registry with one connector per source, in the fixed order
    /// documents, jira, linear, wiki.
    pub fn build_registry(self) -> Registry {
        Registry::new()
            .with(Arc::new(GoogleDocsConnector::new(self.google_docs)))
            .with(Arc::new(JiraConnector::new(self.jira)))
            .with(Arc::new(LinearConnector::new(self.linear)))
            .with(Arc::new(ConfluenceConnector::new(self.confluence)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> Workspace {
        Workspace {
            google_docs: DocumentStore {
                documents: vec![
                    RawDocument {
                        id: "launch-prfaq".to_string(),
                        ..RawDocument::default()
                    },
                    RawDocument {
                        id: "doc-1".to_string(),
                        ..RawDocument::default()
                    },
                ],
                connected: Vec::new(),
            },
            jira: TicketStore {
                tickets: ["PROJ-1", "OPS-1", "PROJ-2"]
                    .iter()
                    .map(|id| Ticket {
                        id: id.to_string(),
                        ..Ticket::default()
                    })
                    .collect(),
                connected: Vec::new(),
            },
            ..Workspace::default()
        }
    }

    #[test]
    fn test_connect_infers_document_type() {
        let mut ws = workspace();
        let connection = ws
            .connect(SourceKind::GoogleDocs, "launch-prfaq", None)
            .unwrap();
        assert_eq!(connection.document_type, Some(DocumentType::Prfaq));

        let connection = ws
            .connect(SourceKind::GoogleDocs, "doc-1", Some(DocumentType::Strategy))
            .unwrap();
        assert_eq!(connection.document_type, Some(DocumentType::Strategy));
    }

    #[test]
    fn test_reconnect_replaces_connection() {
        let mut ws = workspace();
        ws.connect(SourceKind::GoogleDocs, "doc-1", None).unwrap();
        ws.connect(SourceKind::GoogleDocs, "doc-1", Some(DocumentType::Strategy))
            .unwrap();

        assert_eq!(ws.connection_count(SourceKind::GoogleDocs), 1);
        assert_eq!(
            ws.google_docs.connected[0].document_type,
            Some(DocumentType::Strategy)
        );
    }

    #[test]
    fn test_connect_unknown_document_fails() {
        let mut ws = workspace();
        let err = ws.connect(SourceKind::GoogleDocs, "missing", None).unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
        assert!(ws.connect(SourceKind::Confluence, "page9", None).is_err());
    }

    #[test]
    fn test_connected_tickets_follow_project_order() {
        let mut ws = workspace();
        ws.connect(SourceKind::Jira, "OPS", None).unwrap();
        ws.connect(SourceKind::Jira, "PROJ", None).unwrap();

        let ids: Vec<_> = ws
            .jira
            .connected_tickets()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["OPS-1", "PROJ-1", "PROJ-2"]);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::load(&dir.path().join("workspace.json")).unwrap();
        assert_eq!(ws, Workspace::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workspace.json");

        let mut ws = workspace();
        ws.connect(SourceKind::Jira, "PROJ", None).unwrap();
        ws.save(&path).unwrap();

        let loaded = Workspace::load(&path).unwrap();
        assert_eq!(loaded, ws);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workspace.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Workspace::load(&path).unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }
}
