//! Response envelope
//!
//! Every terminal turn answers with `{content, next_actions}`. The model is
//! asked for this shape; this module pulls it out of the raw model text and
//! checks it before anything reaches the caller.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MIN_NEXT_ACTIONS: usize = 2;
pub const MAX_NEXT_ACTIONS: usize = 3;

/// Structured final answer of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub content: String,
    pub next_actions: Vec<String>,
}

/// One way an envelope breaks the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// No JSON object in the model text
    MissingJson,
    /// Something JSON-like that does not parse
    InvalidJson(String),
    /// `content` absent or not a string
    MissingContent,
    EmptyContent,
    /// `next_actions` absent or not a list
    MissingNextActions,
    NextActionCount(usize),
    NonStringNextAction(usize),
    EmptyNextAction(usize),
    /// Unfilled template token such as `[Idea]`
    Placeholder { index: usize, token: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingJson => write!(f, "no JSON object found in the answer"),
            Violation::InvalidJson(e) => write!(f, "the JSON object does not parse: {}", e),
            Violation::MissingContent => write!(f, "\"content\" must be a string"),
            Violation::EmptyContent => write!(f, "\"content\" must not be empty"),
            Violation::MissingNextActions => write!(f, "\"next_actions\" must be a list of strings"),
            Violation::NextActionCount(n) => write!(
                f,
                "\"next_actions\" must have {} to {} entries, found {}",
                MIN_NEXT_ACTIONS, MAX_NEXT_ACTIONS, n
            ),
            Violation::NonStringNextAction(i) => {
                write!(f, "next_actions[{}] must be a string", i)
            }
            Violation::EmptyNextAction(i) => write!(f, "next_actions[{}] is empty", i),
            Violation::Placeholder { index, token } => write!(
                f,
                "next_actions[{}] contains the unfilled placeholder {}",
                index, token
            ),
        }
    }
}

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```(?:json|JSON)?\s*(\{[\s\S]*?\})\s*```").expect("valid fenced block regex")
    })
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[[A-Za-z][^\[\]\n]{0,40}\]|\{[A-Za-z][\w \-]{0,40}\}")
            .expect("valid placeholder regex")
    })
}

/// Locate the JSON object in model text: a fenced ```json block first,
/// then the first balanced `{...}`.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(caps) = fenced_block().captures(text) {
        return caps.get(1).map(|m| m.as_str());
    }
    first_balanced_object(text)
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

impl ResponseEnvelope {
    pub fn new(content: impl Into<String>, next_actions: Vec<String>) -> Self {
        Self {
            content: content.into(),
            next_actions,
        }
    }

    /// Generic answer used when no valid envelope could be obtained
    pub fn fallback() -> Self {
        Self::new(
            "Sorry, I couldn't put together a proper answer this time. Please try again, or rephrase your request with a bit more detail.",
            vec![
                "Rephrase your request with more detail".to_string(),
                "Ask me to brainstorm startup ideas on a theme you care about".to_string(),
            ],
        )
    }

    /// Extract and validate the envelope from raw model text
    pub fn from_model_output(text: &str) -> Result<Self, Vec<Violation>> {
        let json = extract_json(text).ok_or_else(|| vec![Violation::MissingJson])?;
        let value: Value =
            serde_json::from_str(json).map_err(|e| vec![Violation::InvalidJson(e.to_string())])?;
        Self::from_value(&value)
    }

    /// Build from a parsed JSON value, collecting every violation
    pub fn from_value(value: &Value) -> Result<Self, Vec<Violation>> {
        let mut violations = Vec::new();

        let content = match value.get("content").and_then(Value::as_str) {
            Some(c) => c.to_string(),
            None => {
                violations.push(Violation::MissingContent);
                String::new()
            }
        };

        let mut next_actions = Vec::new();
        match value.get("next_actions").and_then(Value::as_array) {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(s) => next_actions.push(s.to_string()),
                        None => violations.push(Violation::NonStringNextAction(i)),
                    }
                }
            }
            None => violations.push(Violation::MissingNextActions),
        }

        let envelope = Self::new(content, next_actions);
        let content_missing = violations.contains(&Violation::MissingContent);
        if let Err(more) = envelope.validate() {
            for v in more {
                if v == Violation::EmptyContent && content_missing {
                    continue;
                }
                if !violations.contains(&v) {
                    violations.push(v);
                }
            }
        }

        if violations.is_empty() {
            Ok(envelope)
        } else {
            Err(violations)
        }
    }

    /// Check the envelope contract
    pub fn validate(&self) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();

        if self.content.trim().is_empty() {
            violations.push(Violation::EmptyContent);
        }

        let count = self.next_actions.len();
        if !(MIN_NEXT_ACTIONS..=MAX_NEXT_ACTIONS).contains(&count) {
            violations.push(Violation::NextActionCount(count));
        }

        for (index, action) in self.next_actions.iter().enumerate() {
            if action.trim().is_empty() {
                violations.push(Violation::EmptyNextAction(index));
                continue;
            }
            if let Some(m) = placeholder().find(action) {
                violations.push(Violation::Placeholder {
                    index,
                    token: m.as_str().to_string(),
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Follow-up instruction asking the model to fix its answer
pub fn correction_prompt(violations: &[Violation]) -> String {
    let mut prompt = String::from(
        "Your previous answer did not follow the required response format:\n",
    );
    for v in violations {
        prompt.push_str(&format!("- {}\n", v));
    }
    prompt.push_str(
        "\nReply again with only a ```json code block containing an object with a non-empty \
         \"content\" string and a \"next_actions\" list of 2 to 3 specific suggestions for the \
         user. Replace every bracketed placeholder with the actual name or detail.",
    );
    prompt
}
