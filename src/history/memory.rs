//! In-process history store
//!
//! Used by the `memory` backend and by tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{sort_by_creation, HistoryMessage, HistoryStore};
use crate::core::{CofounderError, Result};

/// History store kept in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    sessions: RwLock<HashMap<String, Vec<HistoryMessage>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one message
    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn messages(&self, session_id: &str) -> Result<Vec<HistoryMessage>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| CofounderError::history("memory store lock poisoned"))?;
        let mut messages = sessions.get(session_id).cloned().unwrap_or_default();
        sort_by_creation(&mut messages);
        Ok(messages)
    }

    async fn append(&self, session_id: &str, message: HistoryMessage) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| CofounderError::history("memory store lock poisoned"))?;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
