//! Agent descriptors
//!
//! The static roster: one root orchestrator and three specialists, each with
//! a capability description, instruction text and a declared tool set.
//! Built once at startup and never mutated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tools::{CODEGEN_TOOL, HISTORY_TOOL, SEARCH_TOOL};

/// Identity of a configured agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentId {
    #[serde(rename = "AICofounder")]
    Cofounder,
    #[serde(rename = "IdeaBrainstormer")]
    Brainstormer,
    #[serde(rename = "IdeaValidator")]
    Validator,
    #[serde(rename = "MarketResearcher")]
    Researcher,
}

impl AgentId {
    pub const SPECIALISTS: [AgentId; 3] = [
        AgentId::Brainstormer,
        AgentId::Validator,
        AgentId::Researcher,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentId::Cofounder => "AICofounder",
            AgentId::Brainstormer => "IdeaBrainstormer",
            AgentId::Validator => "IdeaValidator",
            AgentId::Researcher => "MarketResearcher",
        }
    }

    /// Case-insensitive lookup by agent name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        [
            AgentId::Cofounder,
            AgentId::Brainstormer,
            AgentId::Validator,
            AgentId::Researcher,
        ]
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A callable agent
#[derive(Debug, Clone, Serialize)]
pub struct AgentDescriptor {
    pub id: AgentId,
    /// What the agent is good at; the router matches turns against it
    pub description: String,
    /// System instruction given to the model
    #[serde(skip)]
    pub instruction: String,
    /// Tools the agent may call
    pub tools: Vec<String>,
    /// Specialists this agent may delegate to
    pub sub_agents: Vec<AgentId>,
    /// Lower-case phrases signalling this agent's capability
    #[serde(skip)]
    pub routing_hints: Vec<String>,
}

impl AgentDescriptor {
    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn declares_tool(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }
}

/// Output contract shared by every agent
const ENVELOPE_INSTRUCTION: &str = r#"
Response format:
Finish with your final answer as a JSON object inside a ```json code block:
```json
{
  "content": "Your full answer here",
  "next_actions": ["A concrete next step", "Another concrete next step"]
}
```
- "content" holds the core answer.
- "next_actions" holds 2 or 3 follow-up suggestions addressed to the user, written as specific actions.
- Fill in real names and details. Never leave bracketed placeholders such as [Idea] in any field."#;

const COFOUNDER_INSTRUCTION: &str = r#"You are AICofounder, an assistant that helps founders develop and evaluate startup ideas.
Requests for new ideas, idea validation and market research are handled by specialist agents; the turns that reach you are the rest: general questions, clarifications, planning help and code requests.

- Use get_session_history to catch up on the conversation when the request refers to earlier turns.
- Use search_web when a factual answer needs current information.
- Use generate_code when the user asks for code. It is not implemented yet; say so plainly instead of inventing code output.
Be clear, helpful and action-oriented."#;

const BRAINSTORMER_INSTRUCTION: &str = r#"You are IdeaBrainstormer, a startup idea generator.
Produce a list of creative, varied startup ideas that answer the user's prompt or theme.
Weigh novelty, feasibility and market potential, and describe each idea in a sentence or two.
Use get_session_history if the request builds on earlier turns.
Suggest next steps that refer to the ideas you actually proposed, by name."#;

const VALIDATOR_INSTRUCTION: &str = r#"You are IdeaValidator, a critical reviewer of startup ideas.
Evaluate the idea the user gives you: market fit, feasibility, scalability, differentiation and business model.
Name the key risks and the key opportunities explicitly, and give constructive feedback.
Use search_web to check competitors or demand when it would sharpen the assessment, and get_session_history for earlier context.
If search returns fallback_results, treat them as placeholders, not evidence, and say the assessment is not backed by live data."#;

const RESEARCHER_INSTRUCTION: &str = r#"You are MarketResearcher, a market analyst for early-stage startups.
Gather and synthesize market size, target audience, competitors and industry trends for the user's question.
You must use search_web to look for data. Use get_session_history for earlier context.
If search returns status "error" or fallback_results, do not present those results as data: state clearly that live research was unavailable and that any figures are rough, unverified estimates."#;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The static set of agents
#[derive(Debug, Clone)]
pub struct AgentRoster {
    root: AgentDescriptor,
    specialists: Vec<AgentDescriptor>,
}

impl AgentRoster {
    /// The cofounder and its three specialists
    pub fn standard() -> Self {
        let brainstormer = AgentDescriptor {
            id: AgentId::Brainstormer,
            description: "Specializes in generating creative and diverse startup ideas from a prompt or theme, focusing on novelty and feasibility.".to_string(),
            instruction: format!("{}\n{}", BRAINSTORMER_INSTRUCTION, ENVELOPE_INSTRUCTION),
            tools: strings(&[HISTORY_TOOL]),
            sub_agents: Vec::new(),
            routing_hints: strings(&[
                "ideas", "an idea", "brainstorm", "come up with", "suggest", "inspiration",
                "what could i build", "what should i build", "new startup",
            ]),
        };

        let validator = AgentDescriptor {
            id: AgentId::Validator,
            description: "Analyzes the viability of a specific startup idea: market fit, challenges and strengths. Provides critical feedback.".to_string(),
            instruction: format!("{}\n{}", VALIDATOR_INSTRUCTION, ENVELOPE_INSTRUCTION),
            tools: strings(&[HISTORY_TOOL, SEARCH_TOOL]),
            sub_agents: Vec::new(),
            routing_hints: strings(&[
                "viable", "viability", "validate", "evaluate", "feasible", "feasibility",
                "critique", "worth pursuing", "good idea", "risks", "pros and cons",
                "would it work", "will it work",
            ]),
        };

        let researcher = AgentDescriptor {
            id: AgentId::Researcher,
            description: "Gathers and synthesizes market data, competitor information and industry trends for a startup idea or sector.".to_string(),
            instruction: format!("{}\n{}", RESEARCHER_INSTRUCTION, ENVELOPE_INSTRUCTION),
            tools: strings(&[HISTORY_TOOL, SEARCH_TOOL]),
            sub_agents: Vec::new(),
            routing_hints: strings(&[
                "market size", "market share", "tam", "competitor", "competitors",
                "competition", "industry", "trend", "trends", "research", "statistics",
                "how big is",
            ]),
        };

        let root = AgentDescriptor {
            id: AgentId::Cofounder,
            description: "The main orchestrator that talks to the user, delegates to the specialist agents and answers everything else directly.".to_string(),
            instruction: format!("{}\n{}", COFOUNDER_INSTRUCTION, ENVELOPE_INSTRUCTION),
            tools: strings(&[CODEGEN_TOOL, SEARCH_TOOL, HISTORY_TOOL]),
            sub_agents: AgentId::SPECIALISTS.to_vec(),
            routing_hints: Vec::new(),
        };

        Self {
            root,
            specialists: vec![brainstormer, validator, researcher],
        }
    }

    /// The orchestrator
    pub fn root(&self) -> &AgentDescriptor {
        &self.root
    }

    /// Delegation candidates, in declaration order
    pub fn specialists(&self) -> &[AgentDescriptor] {
        &self.specialists
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentDescriptor> {
        if id == self.root.id {
            return Some(&self.root);
        }
        self.specialists.iter().find(|a| a.id == id)
    }

    /// Every agent, root first
    pub fn all(&self) -> impl Iterator<Item = &AgentDescriptor> {
        std::iter::once(&self.root).chain(self.specialists.iter())
    }
}

impl Default for AgentRoster {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_tools() {
        let roster = AgentRoster::standard();
        let get = |id| roster.get(id).unwrap();

        assert_eq!(get(AgentId::Brainstormer).tools, vec![HISTORY_TOOL]);
        assert!(get(AgentId::Validator).declares_tool(SEARCH_TOOL));
        assert!(get(AgentId::Researcher).declares_tool(SEARCH_TOOL));
        assert!(get(AgentId::Cofounder).declares_tool(CODEGEN_TOOL));
        assert!(!get(AgentId::Researcher).declares_tool(CODEGEN_TOOL));
    }

    #[test]
    fn test_root_delegates_to_every_specialist() {
        let roster = AgentRoster::standard();
        let ids: Vec<_> = roster.specialists().iter().map(|a| a.id).collect();
        assert_eq!(roster.root().sub_agents, ids);
        assert_eq!(roster.all().count(), 4);
    }

    #[test]
    fn test_instructions_carry_envelope_contract() {
        for agent in AgentRoster::standard().all() {
            assert!(agent.instruction.contains("next_actions"), "{}", agent.name());
        }
    }

    #[test]
    fn test_names_round_trip() {
        assert_eq!(AgentId::from_name("ideavalidator"), Some(AgentId::Validator));
        assert_eq!(AgentId::from_name(" MarketResearcher "), Some(AgentId::Researcher));
        assert_eq!(AgentId::from_name("NONE"), None);
        assert_eq!(
            serde_json::to_value(AgentId::Brainstormer).unwrap(),
            "IdeaBrainstormer"
        );
    }
}
