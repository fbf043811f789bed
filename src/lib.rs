//! Cofounder - an AI cofounder agent team
//!
//! A root orchestrator and three specialists (idea brainstormer, idea
//! validator, market researcher) that help founders develop startup ideas,
//! served over HTTP and an interactive terminal chat.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Model provider abstraction with Gemini and Ollama implementations
//! - **History**: Session history stores (Firestore, in-memory)
//! - **Tools**: Session history, web search and code generation tools
//! - **Agent**: Roster, routing, the per-agent tool loop and the response envelope
//! - **Session**: In-process session registry
//! - **Server**: HTTP API and web UI
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use cofounder::{Cofounder, Config};
//!
//! #[tokio::main]
//! async fn main() -> cofounder::Result<()> {
//!     let cofounder = Cofounder::from_config(&Config::load())?;
//!     let outcome = cofounder
//!         .handle_turn("demo", "give me 3 ideas for a pet-care startup")
//!         .await?;
//!     println!("{}", outcome.envelope.content);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod history;
pub mod llm;
pub mod server;
pub mod session;
pub mod tools;

// Re-export commonly used items
pub use agent::{Cofounder, ResponseEnvelope, TurnOutcome};
pub use cli::{render_outcome, Repl};
pub use core::{CofounderError, Config, Result};
