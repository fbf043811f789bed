//! Code generation tool
//!
//! Not implemented yet: agents may still declare and call it, and get an
//! explicit `not_implemented` answer echoing the prompt.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, CODEGEN_TOOL};
use crate::core::{ToolCall, ToolDefinition};

#[derive(Debug, Clone, Default)]
pub struct GenerateCodeTool;

impl GenerateCodeTool {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, prompt: &str, context: &str) -> Value {
        log::info!("Tool: Generating code for prompt: {}", prompt);
        log::debug!("Code generation context: {} chars", context.len());

        json!({
            "status": "not_implemented",
            "message": "Code generation is not available yet; nothing was generated.",
            "placeholder": format!("Code generated for {}...", prompt),
        })
    }
}

#[async_trait]
impl Tool for GenerateCodeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            CODEGEN_TOOL,
            "Generates starter code for a product idea. Currently returns a placeholder only.",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "What to build"
                    },
                    "context": {
                        "type": "string",
                        "description": "Relevant details from the conversation"
                    }
                },
                "required": ["prompt"]
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Value {
        let prompt = call.get_string("prompt").unwrap_or_default();
        let context = call.get_string("context").unwrap_or_default();
        self.generate(&prompt, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_echoes_prompt() {
        let out = GenerateCodeTool::new().generate("a landing page", "");
        assert_eq!(out["status"], "not_implemented");
        assert_eq!(out["placeholder"], "Code generated for a landing page...");
    }
}
