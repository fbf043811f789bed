//! CLI commands
//!
//! Special commands that can be executed in the REPL. A command is a single
//! word, optionally prefixed with '/'; anything else is sent as a turn.

use crate::agent::{Cofounder, TurnOutcome};
use crate::core::Result;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Send as a turn
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Switch to a fresh session
    NewSession,
}

/// Parse and handle special commands
pub async fn handle_command(
    input: &str,
    cofounder: &Cofounder,
    session_id: &str,
) -> Result<CommandResult> {
    let input = input.trim();
    let word = input.strip_prefix('/').unwrap_or(input);
    if word.contains(char::is_whitespace) {
        return Ok(CommandResult::Continue(input.to_string()));
    }

    match word.to_lowercase().as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "new" | "clear" | "reset" => Ok(CommandResult::NewSession),

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "agents" => Ok(CommandResult::Handled(agents_text(cofounder))),

        "status" => {
            let messages = cofounder
                .sessions()
                .messages(session_id)
                .await
                .map(|m| m.len())
                .unwrap_or(0);
            let status = format!(
                "Cofounder Status:\n\
                 ─────────────────────────────\n\
                 Model:    {}\n\
                 Router:   {}\n\
                 History:  {}\n\
                 Tools:    {}\n\
                 Session:  {}\n\
                 Messages: {}",
                cofounder.model(),
                cofounder.router_name(),
                cofounder.history_backend().unwrap_or("not configured"),
                cofounder.tools().names().join(", "),
                session_id,
                messages
            );
            Ok(CommandResult::Handled(status))
        }

        "history" => {
            let messages = cofounder
                .sessions()
                .messages(session_id)
                .await
                .unwrap_or_default();
            if messages.is_empty() {
                return Ok(CommandResult::Handled(
                    "No messages in this session yet.".to_string(),
                ));
            }
            let lines: Vec<String> = messages
                .iter()
                .map(|m| {
                    let who = m.agent.as_deref().unwrap_or(&m.role);
                    format!("[{}] {}: {}", m.created_at.format("%H:%M:%S"), who, m.content)
                })
                .collect();
            Ok(CommandResult::Handled(lines.join("\n")))
        }

        _ if input.starts_with('/') => Ok(CommandResult::Handled(format!(
            "Unknown command: {}. Type 'help' for available commands.",
            word
        ))),

        _ => Ok(CommandResult::Continue(input.to_string())),
    }
}

fn agents_text(cofounder: &Cofounder) -> String {
    let roster = cofounder.roster();
    let mut output = String::from("Agents:\n");
    for agent in roster.all() {
        output.push_str(&format!(
            "  {}\n    {}\n    tools: {}\n",
            agent.name(),
            agent.description,
            agent.tools.join(", ")
        ));
    }
    output
}

/// Envelope as terminal text
pub fn render_outcome(outcome: &TurnOutcome) -> String {
    let mut output = format!("[{}]\n{}\n", outcome.agent, outcome.envelope.content);
    if !outcome.degraded_tools.is_empty() {
        output.push_str(&format!(
            "\n(Unverified: {} returned fallback data)\n",
            outcome.degraded_tools.join(", ")
        ));
    }
    output.push_str("\nNext steps:\n");
    for (i, action) in outcome.envelope.next_actions.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, action));
    }
    output
}

/// Generate help text
fn help_text() -> String {
    r#"Cofounder Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit
  new              Start a new session
  agents           List the agent team
  status           Show model, tools and session
  history          Show this session's messages

Anything else is sent to your AI cofounder.

Tips:
  - Ask for ideas to reach the IdeaBrainstormer
  - Ask whether an idea is viable to reach the IdeaValidator
  - Ask about market size or competitors to reach the MarketResearcher
─────────────────────────────────────────────"#
        .to_string()
}
