//! Web search tool (Serper)
//!
//! One request per call, no retry and no caching. Without an API key the
//! tool answers from a single synthetic placeholder and sends nothing.
//! `fallback_results` are filler, never real data.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Tool, SEARCH_TOOL};
use crate::core::config::SearchConfig;
use crate::core::{CofounderError, Result, ToolCall, ToolDefinition};

/// Searches the web through the Serper API
pub struct WebSearchTool {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    country: String,
    language: String,
    num_results: u32,
}

impl WebSearchTool {
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            country: config.country.clone(),
            language: config.language.clone(),
            num_results: config.num_results,
        })
    }

    /// Run one search and return the tool payload
    pub async fn search(&self, query: &str) -> Value {
        let Some(api_key) = self.api_key.as_deref() else {
            log::warn!("SERPER_API_KEY not set. Using fallback search results.");
            return fallback(
                "Search API key not configured. Please set SERPER_API_KEY environment variable.",
                "Sample result (fallback mode)",
                "This is a sample result because the search API is not configured.",
            );
        };

        if query.trim().is_empty() {
            return search_failed("query is empty");
        }

        log::info!("Searching for: {}", query);

        let body = json!({
            "q": query,
            "gl": self.country,
            "hl": self.language,
            "num": self.num_results,
        });

        match self.request(api_key, &body).await {
            Ok(results) => json!({
                "status": "success",
                "organic": results.get("organic").cloned().unwrap_or_else(|| json!([])),
                "knowledge_graph": results.get("knowledgeGraph").cloned().unwrap_or_else(|| json!({})),
            }),
            Err(e) => {
                log::warn!("Search error: {}", e);
                search_failed(&e.to_string())
            }
        }
    }

    async fn request(&self, api_key: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CofounderError::search(format!(
                "Serper returned {}: {}",
                status,
                detail.trim()
            )));
        }

        Ok(response.json().await?)
    }
}

fn search_failed(reason: &str) -> Value {
    fallback(
        &format!("Search failed: {}", reason),
        "Error occurred during search",
        &format!("An error occurred: {}", reason),
    )
}

fn fallback(message: &str, title: &str, snippet: &str) -> Value {
    json!({
        "status": "error",
        "message": message,
        "fallback_results": [{
            "title": title,
            "link": "https://example.com",
            "snippet": snippet,
        }]
    })
}

#[async_trait]
impl Tool for WebSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            SEARCH_TOOL,
            "Searches the web for relevant information such as market size, competitors and trends.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Value {
        let query = call.get_string("query").unwrap_or_default();
        self.search(&query).await
    }
}
