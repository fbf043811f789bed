//! Agent execution loop
//!
//! Runs a single agent for a single turn: a bounded tool-calling loop over
//! the agent's declared tools, then envelope extraction with a correction
//! retry. LLM failures never escape; the run falls back to the generic
//! envelope instead.

use std::sync::Arc;

use futures::future::join_all;

use crate::agent::descriptor::AgentDescriptor;
use crate::agent::envelope::{correction_prompt, ResponseEnvelope};
use crate::agent::loop_state::{AgentLoopState, ToolInvocation};
use crate::core::{Message, Result, ToolDefinition};
use crate::llm::{GenerateOptions, LLMProvider};
use crate::tools::ToolRegistry;

const SYNTHESIS_PROMPT: &str = "You have used all available tool calls for this turn. \
Using the tool results above, give your final answer now in the required JSON format.";

/// Result of one agent run
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub envelope: ResponseEnvelope,
    pub invocations: Vec<ToolInvocation>,
    pub degraded_tools: Vec<String>,
    /// The envelope is the generic fallback
    pub fallback: bool,
}

/// Executes agents against a model and the shared tool registry
#[derive(Clone)]
pub struct AgentRunner {
    llm: Arc<dyn LLMProvider>,
    model: String,
    tools: Arc<ToolRegistry>,
    max_turns: usize,
    format_retries: usize,
    temperature: f32,
}

impl AgentRunner {
    pub fn new(llm: Arc<dyn LLMProvider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            model: model.into(),
            tools,
            max_turns: 6,
            format_retries: 1,
            temperature: 0.7,
        }
    }

    /// Bound on tool-calling rounds
    pub fn max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    /// Correction attempts after a malformed answer
    pub fn format_retries(mut self, retries: usize) -> Self {
        self.format_retries = retries;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run `agent` on the user turn `text`
    pub async fn run(
        &self,
        agent: &AgentDescriptor,
        session_id: &str,
        history: &[Message],
        text: &str,
    ) -> AgentRun {
        let mut messages = Self::build_messages(agent, session_id, history, text);
        let tool_defs = self.tools.definitions_for(&agent.tools);
        let mut state = AgentLoopState::new(self.max_turns);

        log::info!(
            "[{}] Starting run (max {} turns, {} tools)",
            agent.name(),
            self.max_turns,
            tool_defs.len()
        );

        let answer = match self
            .tool_loop(agent, &tool_defs, &mut messages, &mut state)
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                log::warn!("[{}] Model call failed, using fallback: {}", agent.name(), e);
                return Self::finish(state, ResponseEnvelope::fallback(), true);
            }
        };

        match self.finalize(agent, answer, &mut messages).await {
            Ok(Some(envelope)) => Self::finish(state, envelope, false),
            Ok(None) => Self::finish(state, ResponseEnvelope::fallback(), true),
            Err(e) => {
                log::warn!(
                    "[{}] Model call failed during correction, using fallback: {}",
                    agent.name(),
                    e
                );
                Self::finish(state, ResponseEnvelope::fallback(), true)
            }
        }
    }

    fn finish(state: AgentLoopState, envelope: ResponseEnvelope, fallback: bool) -> AgentRun {
        let degraded_tools = state.degraded_tools();
        AgentRun {
            envelope,
            invocations: state.invocations,
            degraded_tools,
            fallback,
        }
    }

    /// System instruction, recent conversation, then the user turn
    pub fn build_messages(
        agent: &AgentDescriptor,
        session_id: &str,
        history: &[Message],
        text: &str,
    ) -> Vec<Message> {
        let system = format!(
            "{}\n\nThe current session id is \"{}\". Pass it as session_id when calling get_session_history.",
            agent.instruction, session_id
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(text));
        messages
    }

    async fn tool_loop(
        &self,
        agent: &AgentDescriptor,
        tool_defs: &[ToolDefinition],
        messages: &mut Vec<Message>,
        state: &mut AgentLoopState,
    ) -> Result<String> {
        let options = GenerateOptions::temperature(self.temperature);

        while state.should_continue() {
            let response = self
                .llm
                .chat_with_tools(&self.model, messages, tool_defs, Some(options.clone()))
                .await?;

            if response.tool_calls.is_empty() {
                state.final_answer = Some(response.content);
                break;
            }

            log::info!(
                "[{}] Turn {}/{}: executing {} tool(s)",
                agent.name(),
                state.turn + 1,
                state.max_turns,
                response.tool_calls.len()
            );

            // Concurrent within the batch, results kept in call order
            let outputs = join_all(
                response
                    .tool_calls
                    .iter()
                    .map(|call| self.tools.execute(call, &agent.tools)),
            )
            .await;

            messages.push(Message::assistant_with_tools(
                response.content,
                response.tool_calls.clone(),
            ));

            let mut batch = Vec::with_capacity(outputs.len());
            for (call, output) in response.tool_calls.into_iter().zip(outputs) {
                let invocation = ToolInvocation::from_output(&call.name, call.arguments, &output);
                if invocation.degraded {
                    log::warn!("[{}] {} degraded: {}", agent.name(), call.name, output);
                } else {
                    log::debug!("[{}] {} -> {}", agent.name(), call.name, output);
                }
                messages.push(Message::tool(call.name, output));
                batch.push(invocation);
            }

            state.record(batch);
            state.next_turn();
        }

        if let Some(answer) = state.final_answer.clone() {
            return Ok(answer);
        }

        log::info!("[{}] Max turns reached, synthesizing", agent.name());
        messages.push(Message::user(SYNTHESIS_PROMPT));
        let response = self
            .llm
            .chat(&self.model, messages, Some(options))
            .await?;
        Ok(response.content)
    }

    /// Extract the envelope, asking for corrections up to `format_retries` times.
    /// `None` when every attempt was malformed.
    async fn finalize(
        &self,
        agent: &AgentDescriptor,
        mut answer: String,
        messages: &mut Vec<Message>,
    ) -> Result<Option<ResponseEnvelope>> {
        let mut attempts = 0;
        loop {
            let violations = match ResponseEnvelope::from_model_output(&answer) {
                Ok(envelope) => return Ok(Some(envelope)),
                Err(violations) => violations,
            };

            let summary: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
            log::warn!(
                "[{}] Malformed answer (attempt {}): {}",
                agent.name(),
                attempts + 1,
                summary.join("; ")
            );

            if attempts >= self.format_retries {
                return Ok(None);
            }
            attempts += 1;

            if !answer.trim().is_empty() {
                messages.push(Message::assistant(answer));
            }
            messages.push(Message::user(correction_prompt(&violations)));
            answer = self
                .llm
                .chat(
                    &self.model,
                    messages,
                    Some(GenerateOptions::temperature(self.temperature)),
                )
                .await?
                .content;
        }
    }
}
