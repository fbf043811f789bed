//! Delegation router
//!
//! Decides whether a turn goes to exactly one specialist or stays with the
//! orchestrator. The matching strategy is pluggable behind [`Router`].
//! A tie between equally good candidates is treated as no match, so the
//! orchestrator answers the turn itself.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::descriptor::{AgentDescriptor, AgentId};
use crate::core::config::RouterKind;
use crate::core::{Config, Message};
use crate::llm::{GenerateOptions, LLMProvider};

/// The turn being routed
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    /// Current user message
    pub text: &'a str,
    /// Earlier messages of the session, oldest first
    pub history: &'a [Message],
}

impl<'a> Turn<'a> {
    pub fn new(text: &'a str, history: &'a [Message]) -> Self {
        Self { text, history }
    }
}

/// Capability matching strategy
#[async_trait]
pub trait Router: Send + Sync {
    /// Pick at most one candidate for the turn; `None` keeps it with the orchestrator
    async fn route(&self, turn: &Turn<'_>, candidates: &[AgentDescriptor]) -> Option<AgentId>;

    fn name(&self) -> &str;
}

/// Build the configured router
pub fn create_router(config: &Config, llm: Arc<dyn LLMProvider>) -> Arc<dyn Router> {
    match config.agent.router {
        RouterKind::Keyword => Arc::new(KeywordRouter),
        RouterKind::Llm => Arc::new(LlmRouter::new(llm, config.llm.model.clone())),
    }
}

/// Deterministic router scoring routing hints found in the turn
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordRouter;

impl KeywordRouter {
    /// Number of distinct hints of `agent` present in `text` as whole words
    pub fn score(text: &str, agent: &AgentDescriptor) -> usize {
        let text = text.to_lowercase();
        agent
            .routing_hints
            .iter()
            .filter(|hint| contains_phrase(&text, hint))
            .count()
    }
}

/// `phrase` occurs in `text` bounded by non-alphanumeric characters
fn contains_phrase(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.match_indices(phrase).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[async_trait]
impl Router for KeywordRouter {
    async fn route(&self, turn: &Turn<'_>, candidates: &[AgentDescriptor]) -> Option<AgentId> {
        let scored: Vec<(AgentId, usize)> = candidates
            .iter()
            .map(|agent| (agent.id, Self::score(turn.text, agent)))
            .collect();

        let best = scored.iter().map(|(_, s)| *s).max().unwrap_or(0);
        if best == 0 {
            return None;
        }

        let mut leaders = scored.iter().filter(|(_, s)| *s == best);
        let winner = leaders.next().map(|(id, _)| *id);
        if leaders.next().is_some() {
            log::info!("Routing tie at score {}; answering directly", best);
            return None;
        }
        winner
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Router that asks the model which specialist fits
pub struct LlmRouter {
    llm: Arc<dyn LLMProvider>,
    model: String,
}

impl LlmRouter {
    pub fn new(llm: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    fn build_messages(turn: &Turn<'_>, candidates: &[AgentDescriptor]) -> Vec<Message> {
        let mut system = String::from(
            "You route a user's message to the single best specialist agent.\n\nSpecialists:\n",
        );
        for agent in candidates {
            system.push_str(&format!("- {}: {}\n", agent.name(), agent.description));
        }
        system.push_str(
            "\nReply with exactly one specialist name from the list, or NONE if the message is a \
             general question, a clarification, or a code request. Reply with the name only.",
        );

        let mut user = String::new();
        let recent = turn.history.len().saturating_sub(6);
        if recent < turn.history.len() {
            user.push_str("Recent conversation:\n");
            for msg in &turn.history[recent..] {
                user.push_str(&format!("{}: {}\n", msg.role, msg.content));
            }
            user.push('\n');
        }
        user.push_str("Message to route:\n");
        user.push_str(turn.text);

        vec![Message::system(system), Message::user(user)]
    }

    /// The candidate the reply names. An exact name wins; a reply that opens
    /// with NONE routes nowhere; otherwise exactly one name must appear.
    pub fn parse_choice(reply: &str, candidates: &[AgentDescriptor]) -> Option<AgentId> {
        let reply = reply.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
        if let Some(id) = AgentId::from_name(reply) {
            return candidates.iter().any(|a| a.id == id).then_some(id);
        }

        let reply = reply.to_lowercase();
        if reply.starts_with("none") {
            return None;
        }

        let named: Vec<AgentId> = candidates
            .iter()
            .filter(|a| reply.contains(&a.name().to_lowercase()))
            .map(|a| a.id)
            .collect();

        match named.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

#[async_trait]
impl Router for LlmRouter {
    async fn route(&self, turn: &Turn<'_>, candidates: &[AgentDescriptor]) -> Option<AgentId> {
        if candidates.is_empty() {
            return None;
        }

        let messages = Self::build_messages(turn, candidates);
        match self
            .llm
            .chat(&self.model, &messages, Some(GenerateOptions::temperature(0.0)))
            .await
        {
            Ok(response) => {
                let choice = Self::parse_choice(&response.content, candidates);
                log::debug!("LLM router reply {:?} -> {:?}", response.content.trim(), choice);
                choice
            }
            Err(e) => {
                log::warn!("LLM routing failed, answering directly: {}", e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::descriptor::AgentRoster;

    async fn route(text: &str) -> Option<AgentId> {
        let roster = AgentRoster::standard();
        KeywordRouter
            .route(&Turn::new(text, &[]), roster.specialists())
            .await
    }

    #[tokio::test]
    async fn test_routes_each_specialist() {
        assert_eq!(
            route("give me 3 ideas for a pet-care startup").await,
            Some(AgentId::Brainstormer)
        );
        assert_eq!(
            route("is a subscription box for artisanal coffee viable?").await,
            Some(AgentId::Validator)
        );
        assert_eq!(
            route("what's the market size for EV charging startups?").await,
            Some(AgentId::Researcher)
        );
        assert_eq!(
            route("Is my idea for a dog-walking app viable?").await,
            Some(AgentId::Validator)
        );
    }

    #[tokio::test]
    async fn test_no_match_and_ties_stay_with_orchestrator() {
        assert_eq!(route("hello, who are you?").await, None);
        assert_eq!(route("write me a landing page in React").await, None);
        // one validator hint and one researcher hint
        assert_eq!(route("evaluate the competition").await, None);
    }

    #[test]
    fn test_whole_word_matching() {
        assert!(contains_phrase("what is the tam here", "tam"));
        assert!(!contains_phrase("tamper-proof packaging", "tam"));
        assert!(contains_phrase("some ideas, please", "ideas"));
        assert!(!contains_phrase("ideasy", "ideas"));
        assert!(contains_phrase("the market size?", "market size"));
    }

    #[test]
    fn test_parse_choice() {
        let roster = AgentRoster::standard();
        let specialists = roster.specialists();

        assert_eq!(
            LlmRouter::parse_choice("MarketResearcher", specialists),
            Some(AgentId::Researcher)
        );
        assert_eq!(
            LlmRouter::parse_choice("  ideavalidator.\n", specialists),
            Some(AgentId::Validator)
        );
        assert_eq!(LlmRouter::parse_choice("NONE", specialists), None);
        assert_eq!(
            LlmRouter::parse_choice("IdeaValidator or MarketResearcher", specialists),
            None
        );
        assert_eq!(
            LlmRouter::parse_choice("`IdeaBrainstormer`", specialists),
            Some(AgentId::Brainstormer)
        );
        assert_eq!(
            LlmRouter::parse_choice("I would pick MarketResearcher here", specialists),
            Some(AgentId::Researcher)
        );
    }

    #[test]
    fn test_parse_choice_none_wins_over_mentions() {
        let roster = AgentRoster::standard();
        let specialists = roster.specialists();

        assert_eq!(
            LlmRouter::parse_choice("NONE - IdeaBrainstormer doesn't fit", specialists),
            None
        );
        assert_eq!(LlmRouter::parse_choice("none.", specialists), None);
        // the root agent is never a routing target
        assert_eq!(LlmRouter::parse_choice("AICofounder", specialists), None);
    }

    #[test]
    fn test_router_prompt_lists_candidates() {
        let roster = AgentRoster::standard();
        let history = vec![Message::user("earlier"), Message::assistant("reply")];
        let messages = LlmRouter::build_messages(
            &Turn::new("rate my idea", &history),
            roster.specialists(),
        );
        assert_eq!(messages.len(), 2);
        for agent in roster.specialists() {
            assert!(messages[0].content.contains(agent.name()));
        }
        assert!(messages[1].content.contains("user: earlier"));
        assert!(messages[1].content.ends_with("rate my idea"));
    }
}
