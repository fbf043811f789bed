//! Session history retrieval tool
//!
//! Read-only. Without a configured store every call answers with a fixed
//! error and never touches a backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{error_payload, Tool, HISTORY_TOOL};
use crate::core::{ToolCall, ToolDefinition};
use crate::history::{bounded, HistoryStore};

const NOT_CONFIGURED: &str = "History store not configured.";
const NOT_CONFIGURED_HINT: &str =
    "Make sure GOOGLE_CLOUD_PROJECT is set in environment, or use the memory history backend";

/// Fetches the ordered message history of a session
pub struct SessionHistoryTool {
    store: Option<Arc<dyn HistoryStore>>,
    timeout: Duration,
}

impl SessionHistoryTool {
    pub fn new(store: Option<Arc<dyn HistoryStore>>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Fetch the history of `session_id` as a tool payload
    pub async fn fetch(&self, session_id: &str) -> Value {
        let Some(store) = &self.store else {
            return error_payload(NOT_CONFIGURED, Some(NOT_CONFIGURED_HINT));
        };

        let session_id = session_id.trim();
        if session_id.is_empty() {
            return error_payload("session_id is required", None);
        }

        log::info!("Tool: Getting history for session {}", session_id);

        let lookup = format!("{} history lookup", store.name());
        let messages = match bounded(&lookup, self.timeout, store.messages(session_id)).await {
            Ok(messages) => messages,
            Err(e) => {
                log::warn!("Error retrieving history for session {}: {}", session_id, e);
                return error_payload(format!("Failed to retrieve session history: {}", e), None);
            }
        };

        if messages.is_empty() {
            return json!({
                "status": "success",
                "history": [],
                "message": "No messages found for this session."
            });
        }

        log::info!(
            "Retrieved {} messages for session {}",
            messages.len(),
            session_id
        );
        json!({ "status": "success", "history": messages })
    }
}

#[async_trait]
impl Tool for SessionHistoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            HISTORY_TOOL,
            "Retrieves the message history for a given session ID, oldest first.",
            json!({
                "type": "object",
                "properties": {
                    "session_id": {
                        "type": "string",
                        "description": "The session whose messages to fetch"
                    }
                },
                "required": ["session_id"]
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Value {
        let session_id = call.get_string("session_id").unwrap_or_default();
        self.fetch(&session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CofounderError, Result};
    use crate::history::{HistoryMessage, MemoryHistoryStore};
    use chrono::{TimeZone, Utc};

    struct FailingStore;

    #[async_trait]
    impl HistoryStore for FailingStore {
        async fn messages(&self, _session_id: &str) -> Result<Vec<HistoryMessage>> {
            Err(CofounderError::history("permission denied"))
        }

        async fn append(&self, _session_id: &str, _message: HistoryMessage) -> Result<()> {
            Err(CofounderError::history("permission denied"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct SlowStore;

    #[async_trait]
    impl HistoryStore for SlowStore {
        async fn messages(&self, _session_id: &str) -> Result<Vec<HistoryMessage>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn append(&self, _session_id: &str, _message: HistoryMessage) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn tool_with(store: Arc<dyn HistoryStore>) -> SessionHistoryTool {
        SessionHistoryTool::new(Some(store), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_empty_session_is_success() {
        let tool = tool_with(Arc::new(MemoryHistoryStore::new()));
        let out = tool.fetch("fresh-session").await;
        assert_eq!(out["status"], "success");
        assert_eq!(out["history"], json!([]));
        assert_eq!(out["message"], "No messages found for this session.");
    }

    #[tokio::test]
    async fn test_history_is_ordered() {
        let store = Arc::new(MemoryHistoryStore::new());
        for (secs, text) in [(30, "third"), (10, "first"), (20, "second")] {
            store
                .append(
                    "s1",
                    HistoryMessage::user(text).at(Some(Utc.timestamp_opt(secs, 0).unwrap())),
                )
                .await
                .unwrap();
        }

        let out = tool_with(store).fetch("s1").await;
        let history = out["history"].as_array().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0]["content"], "first");
        assert_eq!(history[2]["content"], "third");
        assert!(out.get("message").is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_store() {
        let tool = SessionHistoryTool::new(None, Duration::from_secs(1));
        let out = tool.fetch("any").await;
        assert_eq!(out["status"], "error");
        assert_eq!(out["message"], NOT_CONFIGURED);
        assert!(out["hint"].as_str().unwrap().contains("GOOGLE_CLOUD_PROJECT"));
    }

    #[tokio::test]
    async fn test_store_failure_becomes_payload() {
        let out = tool_with(Arc::new(FailingStore)).fetch("s1").await;
        assert_eq!(out["status"], "error");
        assert!(out["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to retrieve session history"));
    }

    #[tokio::test]
    async fn test_store_timeout_becomes_payload() {
        let tool = SessionHistoryTool::new(Some(Arc::new(SlowStore)), Duration::from_millis(50));
        let out = tool.fetch("s1").await;
        assert_eq!(out["status"], "error");
        assert!(out["message"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_blank_session_id() {
        let tool = tool_with(Arc::new(MemoryHistoryStore::new()));
        let out = tool.call(&ToolCall::new(HISTORY_TOOL, json!({}))).await;
        assert_eq!(out["status"], "error");
        assert_eq!(out["message"], "session_id is required");
    }
}
