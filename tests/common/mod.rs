//! Shared test helpers: a scripted model and an offline configuration

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cofounder::core::config::{HistoryBackend, RouterKind};
use cofounder::core::{CofounderError, Config, Message, Result, ToolCall, ToolDefinition};
use cofounder::llm::{GenerateOptions, LLMProvider, LLMResponse};
use serde_json::Value;

/// One request seen by the scripted model
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

impl RecordedCall {
    pub fn system(&self) -> &str {
        self.messages
            .first()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    /// Tool result messages, in order
    pub fn tool_outputs(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.role == "tool")
            .map(|m| m.content.as_str())
            .collect()
    }
}

/// Replays queued responses. When the queue is empty it repeats `default`,
/// or fails like an unreachable model if there is none.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<LLMResponse>>,
    default: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<LLMResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            default: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(text: impl Into<String>) -> Self {
        Self {
            default: Some(text.into()),
            ..Self::new(Vec::new())
        }
    }

    /// Sleep this long before every answer, like a slow model
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat_with_tools(
        &self,
        _model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name().to_string()).collect(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        match (next, &self.default) {
            (Some(response), _) => Ok(response),
            (None, Some(text)) => Ok(LLMResponse::text(text.clone())),
            (None, None) => Err(CofounderError::llm("connection refused")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Offline configuration: no search key, no project id, keyword routing
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.llm.api_key = None;
    config.search.api_key = None;
    config.history.backend = HistoryBackend::Firestore;
    config.history.project_id = None;
    config.agent.router = RouterKind::Keyword;
    config.agent.max_turns = 4;
    config.agent.format_retries = 1;
    config
}

/// A well-formed envelope reply
pub fn envelope_reply(content: &str, actions: &[&str]) -> LLMResponse {
    let body = serde_json::json!({
        "content": content,
        "next_actions": actions,
    });
    LLMResponse::text(format!("```json\n{}\n```", body))
}

pub fn tool_call(name: &str, arguments: Value) -> LLMResponse {
    LLMResponse::with_tool_calls(vec![ToolCall::new(name, arguments)])
}
