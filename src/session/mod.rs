//! In-process session registry
//!
//! A session is the ordered conversation of one user. Turns on a session are
//! serialised by a turn mutex the orchestrator holds for the whole turn. The
//! transcript has its own lock, taken only briefly, so readers never wait
//! for a model call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::core::{CofounderError, Message, Result};

const MAX_SESSION_ID_LEN: usize = 128;

/// One message of a session transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    /// "user" or "agent"
    pub role: String,
    pub content: String,
    /// Agent that produced the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            agent: None,
            created_at: Utc::now(),
        }
    }

    pub fn agent(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "agent".to_string(),
            content: content.into(),
            agent: Some(agent.into()),
            created_at: Utc::now(),
        }
    }

    /// As model context
    pub fn to_message(&self) -> Message {
        if self.role == "user" {
            Message::user(&self.content)
        } else {
            Message::assistant(&self.content)
        }
    }
}

/// A conversation
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    turn: Mutex<()>,
    messages: RwLock<Vec<SessionMessage>>,
}

/// Listing entry for a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            turn: Mutex::new(()),
            messages: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the session's turn slot; hold the guard for the whole turn
    pub async fn begin_turn(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }

    /// Snapshot of the transcript, oldest first
    pub async fn messages(&self) -> Vec<SessionMessage> {
        self.messages.read().await.clone()
    }

    /// Append to the transcript
    pub async fn extend(&self, messages: impl IntoIterator<Item = SessionMessage>) {
        self.messages.write().await.extend(messages);
    }

    pub async fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            message_count: self.messages.read().await.len(),
        }
    }
}

/// Registry of live sessions
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject ids that cannot address a session
    pub fn validate_id(id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(CofounderError::session("session id must not be empty"));
        }
        if id.len() > MAX_SESSION_ID_LEN {
            return Err(CofounderError::session(format!(
                "session id longer than {} characters",
                MAX_SESSION_ID_LEN
            )));
        }
        if id.contains('/') {
            return Err(CofounderError::session("session id must not contain '/'"));
        }
        Ok(())
    }

    /// Start a session with a fresh id
    pub async fn create(&self) -> Arc<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(id.clone()));
        self.sessions.write().await.insert(id, session.clone());
        log::info!("Created session {}", session.id());
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Existing session, or a new one under `id`
    pub async fn get_or_create(&self, id: &str) -> Result<Arc<Session>> {
        Self::validate_id(id)?;
        if let Some(session) = self.get(id).await {
            return Ok(session);
        }
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                log::info!("Created session {}", id);
                Arc::new(Session::new(id.to_string()))
            })
            .clone();
        Ok(session)
    }

    /// All sessions, oldest first
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            summaries.push(session.summary().await);
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    /// Transcript of a session, `None` if it does not exist
    pub async fn messages(&self, id: &str) -> Option<Vec<SessionMessage>> {
        match self.get(id).await {
            Some(session) => Some(session.messages().await),
            None => None,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
