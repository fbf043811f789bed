//! Google Gemini provider
//!
//! Calls the Generative Language REST API (`models/{model}:generateContent`)
//! with function calling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::{CofounderError, Config, Message, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl GeminiProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            api_key: config.llm.api_key.clone(),
        })
    }

    /// Build the request body. System messages become `systemInstruction`;
    /// consecutive messages with the same Gemini role are merged, which
    /// keeps parallel function responses in a single turn.
    fn build_body(
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<&GenerateOptions>,
    ) -> Value {
        let mut system = Vec::new();
        let mut contents: Vec<(String, Vec<Value>)> = Vec::new();

        for msg in messages {
            let (role, parts) = match msg.role.as_str() {
                "system" => {
                    system.push(msg.content.clone());
                    continue;
                }
                "assistant" => {
                    let mut parts = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(json!({ "text": msg.content }));
                    }
                    for call in msg.tool_calls.iter().flatten() {
                        parts.push(json!({
                            "functionCall": { "name": call.name, "args": call.arguments }
                        }));
                    }
                    ("model", parts)
                }
                "tool" => {
                    let name = msg.tool_name.clone().unwrap_or_default();
                    let payload = serde_json::from_str::<Value>(&msg.content)
                        .unwrap_or_else(|_| Value::String(msg.content.clone()));
                    (
                        "user",
                        vec![json!({
                            "functionResponse": {
                                "name": name,
                                "response": { "name": name, "content": payload }
                            }
                        })],
                    )
                }
                _ => ("user", vec![json!({ "text": msg.content })]),
            };

            // Gemini rejects a content entry without parts
            if parts.is_empty() {
                continue;
            }

            match contents.last_mut() {
                Some((last_role, last_parts)) if last_role == role => last_parts.extend(parts),
                _ => contents.push((role.to_string(), parts)),
            }
        }

        let mut body = json!({
            "contents": contents
                .into_iter()
                .map(|(role, parts)| json!({ "role": role, "parts": parts }))
                .collect::<Vec<_>>(),
        });

        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system.join("\n\n") }] });
        }

        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.function.name,
                        "description": t.function.description,
                        "parameters": t.function.parameters,
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        if let Some(opts) = options {
            let mut generation = serde_json::Map::new();
            if let Some(t) = opts.temperature {
                generation.insert("temperature".into(), json!(t));
            }
            if let Some(max) = opts.max_tokens {
                generation.insert("maxOutputTokens".into(), json!(max));
            }
            if let Some(stop) = &opts.stop {
                generation.insert("stopSequences".into(), json!(stop));
            }
            if !generation.is_empty() {
                body["generationConfig"] = Value::Object(generation);
            }
        }

        body
    }

    fn to_llm_response(model: &str, response: GenerateContentResponse) -> Result<LLMResponse> {
        let Some(content) = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
        else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.get("blockReason").cloned())
                .map(|r| r.to_string())
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(CofounderError::llm(format!("Gemini returned no answer: {}", reason)));
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in content.parts {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall::new(call.name, call.args));
            }
        }

        Ok(LLMResponse {
            content: text,
            tool_calls,
            usage: response.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn chat_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            CofounderError::config("GOOGLE_API_KEY not set; cannot call Gemini")
        })?;

        let model = model.trim_start_matches("models/");
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = Self::build_body(messages, tools, options.as_ref());

        log::debug!("Gemini request to {} with {} tool(s)", model, tools.len());

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(CofounderError::llm(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        Self::to_llm_response(model, parsed)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
