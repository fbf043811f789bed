//! Tool registry - manages and dispatches tool calls
//!
//! Central hub for registering tools and routing tool calls to handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{error_payload, GenerateCodeTool, SessionHistoryTool, Tool, WebSearchTool};
use crate::core::{Config, Result, ToolCall, ToolDefinition};
use crate::history::HistoryStore;

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    /// Tool definitions indexed by name
    definitions: HashMap<String, ToolDefinition>,
    /// Handlers indexed by name
    handlers: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the history, search and code generation tools
    pub fn standard(config: &Config, store: Option<Arc<dyn HistoryStore>>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(SessionHistoryTool::new(
            store,
            Duration::from_secs(config.history.timeout_secs),
        )));
        registry.register(Arc::new(WebSearchTool::from_config(&config.search)?));
        registry.register(Arc::new(GenerateCodeTool::new()));
        Ok(registry)
    }

    /// Register a tool under the name in its definition
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let definition = tool.definition();
        let name = definition.function.name.clone();
        self.definitions.insert(name.clone(), definition);
        self.handlers.insert(name, tool);
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Definitions for a declared tool set, in declaration order.
    /// Unknown names are skipped.
    pub fn definitions_for(&self, names: &[String]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.definitions.get(name).cloned())
            .collect()
    }

    /// Execute a tool call on behalf of an agent that declared `allowed`.
    /// Always returns a JSON string.
    pub async fn execute(&self, tool_call: &ToolCall, allowed: &[String]) -> String {
        if !allowed.iter().any(|name| name == &tool_call.name) {
            log::warn!("Rejected undeclared tool call: {}", tool_call.name);
            return error_payload(
                format!("Tool not available to this agent: {}", tool_call.name),
                None,
            )
            .to_string();
        }

        match self.handlers.get(&tool_call.name) {
            Some(tool) => tool.call(tool_call).await.to_string(),
            None => error_payload(format!("Unknown tool: {}", tool_call.name), None).to_string(),
        }
    }
}
