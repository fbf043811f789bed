//! Agent module - the cofounder team
//!
//! Descriptors for the root agent and its specialists, delegation routing,
//! the per-agent tool loop and the response envelope contract.

pub mod descriptor;
pub mod envelope;
pub mod loop_state;
pub mod orchestrator;
pub mod router;
pub mod runner;

pub use descriptor::{AgentDescriptor, AgentId, AgentRoster};
pub use envelope::{ResponseEnvelope, Violation};
pub use loop_state::{AgentLoopState, ToolInvocation};
pub use orchestrator::{Cofounder, TurnOutcome};
pub use router::{create_router, KeywordRouter, LlmRouter, Router, Turn};
pub use runner::{AgentRun, AgentRunner};
