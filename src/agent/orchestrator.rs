//! Agent orchestrator
//!
//! The `Cofounder` owns the agent team. Each user turn is routed to at most
//! one specialist; when no specialist fits, the root agent answers itself.
//! Exactly one agent produces the envelope, which is returned verbatim.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::agent::descriptor::{AgentDescriptor, AgentId, AgentRoster};
use crate::agent::envelope::ResponseEnvelope;
use crate::agent::loop_state::ToolInvocation;
use crate::agent::router::{create_router, Router, Turn};
use crate::agent::runner::AgentRunner;
use crate::core::{CofounderError, Config, Message, Result};
use crate::history::{bounded, create_store, HistoryMessage, HistoryStore};
use crate::llm::{create_provider, LLMProvider};
use crate::session::{SessionManager, SessionMessage};
use crate::tools::ToolRegistry;

/// What one turn produced
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub session_id: String,
    /// The agent that produced the envelope
    pub agent: AgentId,
    pub envelope: ResponseEnvelope,
    pub tool_calls: Vec<ToolInvocation>,
    /// Tools that answered with an error or fallback data
    pub degraded_tools: Vec<String>,
    /// The envelope is the generic fallback
    pub fallback: bool,
}

/// Root orchestrator
pub struct Cofounder {
    roster: AgentRoster,
    router: Arc<dyn Router>,
    runner: AgentRunner,
    tools: Arc<ToolRegistry>,
    sessions: SessionManager,
    history: Option<Arc<dyn HistoryStore>>,
    history_window: usize,
    store_timeout: Duration,
}

impl Cofounder {
    /// Build the provider, history store and tools from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = create_provider(config)?;
        let history = create_store(config)?;
        Self::new(config, llm, history)
    }

    /// Build around an existing provider and store
    pub fn new(
        config: &Config,
        llm: Arc<dyn LLMProvider>,
        history: Option<Arc<dyn HistoryStore>>,
    ) -> Result<Self> {
        let tools = Arc::new(ToolRegistry::standard(config, history.clone())?);
        let router = create_router(config, llm.clone());
        let runner = AgentRunner::new(llm, config.llm.model.clone(), tools.clone())
            .max_turns(config.agent.max_turns)
            .format_retries(config.agent.format_retries)
            .temperature(config.llm.temperature);

        log::info!(
            "Cofounder ready: router={}, history={}, tools={:?}",
            router.name(),
            history.as_ref().map(|h| h.name()).unwrap_or("none"),
            tools.names()
        );

        Ok(Self {
            roster: AgentRoster::standard(),
            router,
            runner,
            tools,
            sessions: SessionManager::new(),
            history,
            history_window: config.agent.history_window,
            store_timeout: Duration::from_secs(config.history.timeout_secs),
        })
    }

    /// Replace the routing strategy
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = router;
        self
    }

    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn router_name(&self) -> &str {
        self.router.name()
    }

    pub fn model(&self) -> &str {
        self.runner.model()
    }

    pub fn history_backend(&self) -> Option<&str> {
        self.history.as_ref().map(|h| h.name())
    }

    /// Handle one user turn on `session_id`
    pub async fn handle_turn(&self, session_id: &str, text: &str) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CofounderError::invalid_input("message must not be empty"));
        }

        let session = self.sessions.get_or_create(session_id).await?;
        // held until the turn is recorded
        let _turn = session.begin_turn().await;
        let mut transcript = session.messages().await;
        if transcript.is_empty() {
            transcript = self.restore(session_id).await;
            session.extend(transcript.iter().cloned()).await;
        }

        let start = transcript.len().saturating_sub(self.history_window);
        let context: Vec<Message> = transcript[start..]
            .iter()
            .map(SessionMessage::to_message)
            .collect();

        let agent = self.select(&Turn::new(text, &context)).await;
        log::info!("Session {}: turn handled by {}", session_id, agent.name());

        let run = self.runner.run(agent, session_id, &context, text).await;
        if !run.degraded_tools.is_empty() {
            log::warn!(
                "Session {}: degraded tools {:?}",
                session_id,
                run.degraded_tools
            );
        }

        session
            .extend([
                SessionMessage::user(text),
                SessionMessage::agent(agent.name(), &run.envelope.content),
            ])
            .await;
        self.mirror(session_id, text, &run.envelope.content).await;

        Ok(TurnOutcome {
            session_id: session_id.to_string(),
            agent: agent.id,
            envelope: run.envelope,
            tool_calls: run.invocations,
            degraded_tools: run.degraded_tools,
            fallback: run.fallback,
        })
    }

    /// The specialist picked by the router, or the root agent
    async fn select(&self, turn: &Turn<'_>) -> &AgentDescriptor {
        let routed = self.router.route(turn, self.roster.specialists()).await;
        match routed.and_then(|id| self.roster.get(id)) {
            Some(agent) => {
                log::info!("Delegating to {}", agent.name());
                agent
            }
            None => self.roster.root(),
        }
    }

    /// Earlier transcript of a session from the history store
    async fn restore(&self, session_id: &str) -> Vec<SessionMessage> {
        let Some(store) = &self.history else {
            return Vec::new();
        };
        match bounded("history restore", self.store_timeout, store.messages(session_id)).await {
            Ok(messages) => {
                if !messages.is_empty() {
                    log::info!(
                        "Session {}: restored {} message(s) from {}",
                        session_id,
                        messages.len(),
                        store.name()
                    );
                }
                messages
                    .into_iter()
                    .map(|m| SessionMessage {
                        created_at: m.created_at.unwrap_or_else(chrono::Utc::now),
                        role: m.role,
                        content: m.content,
                        agent: None,
                    })
                    .collect()
            }
            Err(e) => {
                log::warn!("Session {}: could not restore history: {}", session_id, e);
                Vec::new()
            }
        }
    }

    /// Best-effort copy of the turn into the history store
    async fn mirror(&self, session_id: &str, user_text: &str, agent_text: &str) {
        let Some(store) = &self.history else {
            return;
        };
        for message in [HistoryMessage::user(user_text), HistoryMessage::agent(agent_text)] {
            let append = store.append(session_id, message);
            if let Err(e) = bounded("history write", self.store_timeout, append).await {
                log::warn!("Session {}: {}", session_id, e);
                return;
            }
        }
    }
}
