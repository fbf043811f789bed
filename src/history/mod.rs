//! Session history store
//!
//! Persisted layout: a `sessions` collection, each session holding an ordered
//! `messages` sub-collection with `{role, content, createdAt}` fields.
//! Messages are append-only; nothing here deletes them.

pub mod firestore;
pub mod memory;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::{Config, HistoryBackend};
use crate::core::{CofounderError, Result};

pub use firestore::FirestoreHistoryStore;
pub use memory::MemoryHistoryStore;

/// One persisted message of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// "user" or "agent"
    pub role: String,
    pub content: String,
    /// Creation time; `None` while the store has not assigned one yet
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Any other fields written by other clients, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HistoryMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            created_at: Some(Utc::now()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new("agent", content)
    }

    pub fn at(mut self, created_at: Option<DateTime<Utc>>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Order messages by creation time, oldest first. Messages without a
/// timestamp sort last, keeping their relative order.
pub fn sort_by_creation(messages: &mut [HistoryMessage]) {
    messages.sort_by_key(|m| (m.created_at.is_none(), m.created_at));
}

/// Backend holding session messages
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All messages of a session, oldest first. Unknown sessions are empty.
    async fn messages(&self, session_id: &str) -> Result<Vec<HistoryMessage>>;

    /// Append one message to a session
    async fn append(&self, session_id: &str, message: HistoryMessage) -> Result<()>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Run a store call, failing with `Timeout` once `limit` passes
pub async fn bounded<T>(
    what: &str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| CofounderError::timeout(what, limit))?
}

/// Build the configured store, or `None` when the backend cannot be used
/// (Firestore without a project id).
pub fn create_store(config: &Config) -> Result<Option<Arc<dyn HistoryStore>>> {
    match config.history.backend {
        HistoryBackend::Memory => Ok(Some(Arc::new(MemoryHistoryStore::new()))),
        HistoryBackend::Firestore => match config.history.project_id.as_deref() {
            Some(project_id) => {
                let store = FirestoreHistoryStore::from_config(project_id, &config.history)?;
                log::info!("History store: Firestore project {}", project_id);
                Ok(Some(Arc::new(store)))
            }
            None => {
                log::warn!(
                    "GOOGLE_CLOUD_PROJECT not set. Session history tool will report an error."
                );
                Ok(None)
            }
        },
    }
}
