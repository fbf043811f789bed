//! Local model provider backed by an Ollama server
//!
//! Uses the non-streaming `/api/chat` endpoint. Tool definitions are sent in
//! their OpenAI-style function shape, which Ollama accepts unchanged.

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

use crate::core::{CofounderError, Config, Message, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

mod wire {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    use crate::core::ToolDefinition;

    #[derive(Debug, Serialize)]
    pub struct ChatRequest<'a> {
        pub model: &'a str,
        pub messages: Vec<ChatMessage>,
        #[serde(skip_serializing_if = "no_tools")]
        pub tools: &'a [ToolDefinition],
        #[serde(skip_serializing_if = "Option::is_none")]
        pub options: Option<SamplingOptions>,
        pub stream: bool,
    }

    fn no_tools(tools: &&[ToolDefinition]) -> bool {
        tools.is_empty()
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: String,
        #[serde(default)]
        pub content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub tool_calls: Vec<FunctionCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub tool_name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FunctionCall {
        pub function: Function,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Function {
        pub name: String,
        #[serde(default)]
        pub arguments: Value,
    }

    #[derive(Debug, Serialize)]
    pub struct SamplingOptions {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub temperature: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub num_predict: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub stop: Option<Vec<String>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ChatResponse {
        pub model: String,
        pub message: ChatMessage,
        pub prompt_eval_count: Option<u32>,
        pub eval_count: Option<u32>,
    }
}

use wire::{ChatMessage, ChatRequest, ChatResponse, Function, FunctionCall, SamplingOptions};

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        let tool_calls = msg
            .tool_calls
            .iter()
            .flatten()
            .map(|call| FunctionCall {
                function: Function {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            })
            .collect();

        Self {
            role: msg.role.clone(),
            content: msg.content.clone(),
            tool_calls,
            tool_name: msg.tool_name.clone(),
        }
    }
}

impl From<GenerateOptions> for SamplingOptions {
    fn from(opts: GenerateOptions) -> Self {
        Self {
            temperature: opts.temperature,
            num_predict: opts.max_tokens,
            stop: opts.stop,
        }
    }
}

impl From<ChatResponse> for LLMResponse {
    fn from(raw: ChatResponse) -> Self {
        let usage = raw
            .prompt_eval_count
            .zip(raw.eval_count)
            .map(|(prompt, completion)| TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            });

        LLMResponse {
            content: raw.message.content,
            tool_calls: raw
                .message
                .tool_calls
                .into_iter()
                .map(|call| ToolCall::new(call.function.name, call.function.arguments))
                .collect(),
            usage,
            model: raw.model,
        }
    }
}

/// Ollama chat client
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    host: String,
}

impl OllamaClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            host: config.llm.ollama_host.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.host)
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CofounderError::llm(format!("Ollama returned {}: {}", status, body)))
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn chat_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let request = ChatRequest {
            model,
            messages: messages.iter().map(ChatMessage::from).collect(),
            tools,
            options: options.map(SamplingOptions::from),
            stream: false,
        };

        let response = match self.http.post(self.endpoint()).json(&request).send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                return Err(CofounderError::llm(format!(
                    "No Ollama server reachable at {}",
                    self.host
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let raw: ChatResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| CofounderError::llm(format!("Unreadable Ollama reply: {}", e)))?;

        log::debug!("ollama {} answered", raw.model);
        Ok(raw.into())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
