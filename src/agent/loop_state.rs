//! Agent loop state management
//!
//! Tracks one agent run: turn counter, the tool calls made so far and the
//! final answer once the model stops asking for tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State of the agent tool-calling loop
#[derive(Debug, Clone)]
pub struct AgentLoopState {
    /// Current turn number (0-indexed)
    pub turn: usize,
    /// Maximum allowed turns
    pub max_turns: usize,
    /// Every tool call made during the run, in execution order
    pub invocations: Vec<ToolInvocation>,
    /// Final model text once the agent has stopped calling tools
    pub final_answer: Option<String>,
}

impl AgentLoopState {
    /// Create a new loop state with the given max turns
    pub fn new(max_turns: usize) -> Self {
        Self {
            turn: 0,
            max_turns,
            invocations: Vec::new(),
            final_answer: None,
        }
    }

    /// Check if the loop should continue
    pub fn should_continue(&self) -> bool {
        self.turn < self.max_turns && self.final_answer.is_none()
    }

    /// Record a batch of tool calls
    pub fn record(&mut self, invocations: Vec<ToolInvocation>) {
        self.invocations.extend(invocations);
    }

    /// Increment the turn counter
    pub fn next_turn(&mut self) {
        self.turn += 1;
    }

    /// Names of tools that answered with an error or fallback data, deduplicated
    pub fn degraded_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for inv in self.invocations.iter().filter(|i| i.degraded) {
            if !names.contains(&inv.tool) {
                names.push(inv.tool.clone());
            }
        }
        names
    }
}

/// A tool call made by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the tool that was called
    pub tool: String,
    /// Arguments as given by the model
    pub arguments: Value,
    /// The `status` field of the tool output, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Output is an error or carries placeholder data
    pub degraded: bool,
}

impl ToolInvocation {
    /// Classify a tool output
    pub fn from_output(tool: impl Into<String>, arguments: Value, output: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(output).ok();
        let status = parsed
            .as_ref()
            .and_then(|v| v.get("status"))
            .and_then(Value::as_str)
            .map(String::from);
        let has_fallback = parsed
            .as_ref()
            .is_some_and(|v| v.get("fallback_results").is_some());

        Self {
            tool: tool.into(),
            arguments,
            degraded: status.as_deref() == Some("error") || has_fallback,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loop_state_new() {
        let state = AgentLoopState::new(10);
        assert_eq!(state.turn, 0);
        assert_eq!(state.max_turns, 10);
        assert!(state.invocations.is_empty());
        assert!(state.final_answer.is_none());
    }

    #[test]
    fn test_should_continue() {
        let mut state = AgentLoopState::new(2);
        assert!(state.should_continue());

        state.next_turn();
        assert!(state.should_continue());

        state.next_turn();
        assert!(!state.should_continue()); // Reached max turns

        let mut answered = AgentLoopState::new(2);
        answered.final_answer = Some("done".into());
        assert!(!answered.should_continue());
    }

    #[test]
    fn test_classify_outputs() {
        let ok = ToolInvocation::from_output(
            "get_session_history",
            json!({"session_id": "s"}),
            r#"{"status":"success","history":[]}"#,
        );
        assert_eq!(ok.status.as_deref(), Some("success"));
        assert!(!ok.degraded);

        let fallback = ToolInvocation::from_output(
            "search_web",
            json!({"query": "ev charging"}),
            r#"{"status":"error","message":"no key","fallback_results":[{"title":"x"}]}"#,
        );
        assert!(fallback.degraded);

        let stub = ToolInvocation::from_output(
            "generate_code",
            json!({}),
            r#"{"status":"not_implemented"}"#,
        );
        assert!(!stub.degraded);
    }

    #[test]
    fn test_degraded_tools_deduplicated() {
        let mut state = AgentLoopState::new(4);
        let failed = r#"{"status":"error","message":"down"}"#;
        state.record(vec![
            ToolInvocation::from_output("search_web", json!({}), failed),
            ToolInvocation::from_output("get_session_history", json!({}), r#"{"status":"success"}"#),
        ]);
        state.record(vec![ToolInvocation::from_output("search_web", json!({}), failed)]);

        assert_eq!(state.invocations.len(), 3);
        assert_eq!(state.degraded_tools(), vec!["search_web".to_string()]);
    }
}
