//! Tools module - functions the agents can call
//!
//! Every tool answers with a UTF-8 JSON string, since the model consumes tool
//! results as text. Failures never escape a tool as `Err`: they become the
//! shared error payload `{"status": "error", "message", "hint"?}`.

pub mod codegen;
pub mod history;
pub mod registry;
pub mod search;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{ToolCall, ToolDefinition};

pub use codegen::GenerateCodeTool;
pub use history::SessionHistoryTool;
pub use registry::ToolRegistry;
pub use search::WebSearchTool;

pub const HISTORY_TOOL: &str = "get_session_history";
pub const SEARCH_TOOL: &str = "search_web";
pub const CODEGEN_TOOL: &str = "generate_code";

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema advertised to the model
    fn definition(&self) -> ToolDefinition;

    /// Run the tool; the result is a JSON document
    async fn call(&self, call: &ToolCall) -> Value;
}

/// The error payload shared by all tools
pub fn error_payload(message: impl Into<String>, hint: Option<&str>) -> Value {
    let mut payload = json!({
        "status": "error",
        "message": message.into(),
    });
    if let Some(hint) = hint {
        payload["hint"] = json!(hint);
    }
    payload
}

/// The `status` field of a tool output, if it has one
pub fn output_status(output: &str) -> Option<String> {
    serde_json::from_str::<Value>(output)
        .ok()
        .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_payload_shape() {
        let plain = error_payload("boom", None);
        assert_eq!(plain, json!({"status": "error", "message": "boom"}));

        let hinted = error_payload("no store", Some("set it"));
        assert_eq!(hinted["hint"], "set it");
    }

    #[test]
    fn test_output_status() {
        assert_eq!(
            output_status(r#"{"status":"success","history":[]}"#).as_deref(),
            Some("success")
        );
        assert_eq!(output_status("Code generated"), None);
    }
}
