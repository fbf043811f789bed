//! End-to-end turns through the cofounder with a scripted model

mod common;

use std::sync::Arc;
use std::time::Duration;

use cofounder::agent::AgentId;
use cofounder::core::config::HistoryBackend;
use cofounder::history::{create_store, HistoryMessage, HistoryStore, MemoryHistoryStore};
use cofounder::llm::LLMResponse;
use cofounder::{Cofounder, ResponseEnvelope};
use common::{envelope_reply, offline_config, tool_call, ScriptedProvider};
use serde_json::{json, Value};

fn team(llm: Arc<ScriptedProvider>) -> Cofounder {
    Cofounder::new(&offline_config(), llm, None).unwrap()
}

#[tokio::test]
async fn test_brainstorm_request_goes_to_brainstormer() {
    let llm = Arc::new(ScriptedProvider::new(vec![envelope_reply(
        "1. PawPlan: vet visit scheduling. 2. TailTrack: GPS collars. 3. FurFeed: fresh food subscriptions.",
        &["Validate PawPlan", "Research the pet food subscription market"],
    )]));
    let outcome = team(llm.clone())
        .handle_turn("s1", "give me 3 ideas for a pet-care startup")
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentId::Brainstormer);
    assert!(outcome.envelope.is_valid());
    assert!(!outcome.fallback);

    // exactly one agent ran: one model call, with the brainstormer's instruction
    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].system().starts_with("You are IdeaBrainstormer"));
    assert_eq!(calls[0].tools, vec!["get_session_history"]);
}

#[tokio::test]
async fn test_viability_question_goes_to_validator() {
    let llm = Arc::new(ScriptedProvider::new(vec![envelope_reply(
        "Promising niche with strong retention, but margins are thin and roasters compete directly.",
        &["Interview ten specialty coffee buyers", "Price a pilot box"],
    )]));
    let outcome = team(llm.clone())
        .handle_turn("s1", "is a subscription box for artisanal coffee viable?")
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentId::Validator);
    assert!(llm.calls()[0].system().starts_with("You are IdeaValidator"));
}

#[tokio::test]
async fn test_market_question_without_search_key_degrades() {
    let llm = Arc::new(ScriptedProvider::new(vec![
        tool_call("search_web", json!({"query": "EV charging startup market size"})),
        envelope_reply(
            "Live research was unavailable, so these are rough, unverified estimates.",
            &["Set up a search API key and retry", "Narrow the question to one region"],
        ),
    ]));
    let outcome = team(llm.clone())
        .handle_turn("s1", "what's the market size for EV charging startups?")
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentId::Researcher);
    assert!(outcome.envelope.is_valid());
    assert_eq!(outcome.degraded_tools, vec!["search_web".to_string()]);
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(outcome.tool_calls[0].status.as_deref(), Some("error"));

    // the model saw the fallback payload
    let calls = llm.calls();
    let outputs = calls[1].tool_outputs();
    assert_eq!(outputs.len(), 1);
    let payload: Value = serde_json::from_str(outputs[0]).unwrap();
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["fallback_results"].as_array().unwrap().len(), 1);
    assert_eq!(
        payload["fallback_results"][0]["title"],
        "Sample result (fallback mode)"
    );
}

#[tokio::test]
async fn test_general_question_stays_with_orchestrator() {
    let llm = Arc::new(ScriptedProvider::new(vec![envelope_reply(
        "I help you brainstorm, validate and research startup ideas.",
        &["Ask for startup ideas in a field you know", "Describe an idea to validate"],
    )]));
    let outcome = team(llm.clone())
        .handle_turn("s1", "hello, what can you do?")
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentId::Cofounder);
    assert_eq!(
        llm.calls()[0].tools,
        vec!["generate_code", "search_web", "get_session_history"]
    );
}

#[tokio::test]
async fn test_code_request_gets_not_implemented_stub() {
    let llm = Arc::new(ScriptedProvider::new(vec![
        tool_call("generate_code", json!({"prompt": "a landing page"})),
        envelope_reply(
            "Code generation is not available yet, so no code was produced.",
            &["Describe the page sections you need", "Ask me to outline the tech stack"],
        ),
    ]));
    let outcome = team(llm.clone())
        .handle_turn("s1", "write me a landing page in React")
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentId::Cofounder);
    assert_eq!(outcome.tool_calls[0].status.as_deref(), Some("not_implemented"));
    assert!(outcome.degraded_tools.is_empty());
}

#[tokio::test]
async fn test_undeclared_tool_is_refused() {
    let llm = Arc::new(ScriptedProvider::new(vec![
        tool_call("search_web", json!({"query": "pet trends"})),
        envelope_reply("Ideas without research.", &["Validate the first idea", "Refine the theme"]),
    ]));
    let outcome = team(llm.clone())
        .handle_turn("s1", "brainstorm some ideas for pets")
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentId::Brainstormer);
    let output = llm.calls()[1].tool_outputs()[0].to_string();
    assert!(output.contains("Tool not available to this agent: search_web"));
    assert_eq!(outcome.degraded_tools, vec!["search_web".to_string()]);
}

#[tokio::test]
async fn test_malformed_answer_is_retried_once() {
    let llm = Arc::new(ScriptedProvider::new(vec![
        envelope_reply("Three ideas.", &["Validate [Idea]", "Research it"]),
        envelope_reply("Three ideas.", &["Validate PawPlan", "Research PawPlan's market"]),
    ]));
    let outcome = team(llm.clone())
        .handle_turn("s1", "give me ideas")
        .await
        .unwrap();

    assert!(!outcome.fallback);
    assert_eq!(outcome.envelope.next_actions[0], "Validate PawPlan");
    let calls = llm.calls();
    assert_eq!(calls.len(), 2);
    let correction = &calls[1].messages.last().unwrap().content;
    assert!(correction.contains("[Idea]"));
}

#[tokio::test]
async fn test_empty_answer_gets_a_real_retry() {
    let llm = Arc::new(ScriptedProvider::new(vec![
        LLMResponse::text(""),
        envelope_reply("Three ideas.", &["Validate PawPlan", "Research PawPlan's market"]),
    ]));
    let outcome = team(llm.clone())
        .handle_turn("s1", "give me ideas")
        .await
        .unwrap();

    assert!(!outcome.fallback);
    let retry = &llm.calls()[1];
    assert!(retry
        .messages
        .iter()
        .all(|m| m.role != "assistant" || !m.content.is_empty()));
    assert_eq!(retry.messages.last().unwrap().role, "user");
}

#[tokio::test]
async fn test_persistent_malformed_answer_falls_back() {
    let llm = Arc::new(ScriptedProvider::repeating("Sure! Here are my thoughts in prose."));
    let outcome = team(llm.clone())
        .handle_turn("s1", "give me ideas")
        .await
        .unwrap();

    assert!(outcome.fallback);
    assert_eq!(outcome.envelope, ResponseEnvelope::fallback());
    assert_eq!(llm.calls().len(), 2);
}

#[tokio::test]
async fn test_unreachable_model_yields_fallback_envelope() {
    let llm = Arc::new(ScriptedProvider::new(Vec::new()));
    let cofounder = team(llm);
    let outcome = cofounder.handle_turn("s1", "give me ideas").await.unwrap();

    assert!(outcome.fallback);
    assert!(outcome.envelope.is_valid());
    // the turn is still recorded
    assert_eq!(cofounder.sessions().messages("s1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_history_tool_without_project_reports_fixed_error() {
    let llm = Arc::new(ScriptedProvider::new(vec![
        tool_call("get_session_history", json!({"session_id": "s1"})),
        envelope_reply("I could not load our earlier conversation.", &["Restate your idea", "Ask for new ideas"]),
    ]));
    team(llm.clone())
        .handle_turn("s1", "what did we talk about?")
        .await
        .unwrap();

    let payload: Value = serde_json::from_str(llm.calls()[1].tool_outputs()[0]).unwrap();
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["message"], "History store not configured.");
    assert!(payload["hint"].as_str().unwrap().contains("GOOGLE_CLOUD_PROJECT"));
}

#[tokio::test]
async fn test_history_tool_reads_earlier_turns() {
    let mut config = offline_config();
    config.history.backend = HistoryBackend::Memory;
    let store = create_store(&config).unwrap();
    assert!(store.is_some());

    let llm = Arc::new(ScriptedProvider::new(vec![
        envelope_reply("PawPlan and TailTrack.", &["Validate PawPlan", "Validate TailTrack"]),
        tool_call("get_session_history", json!({"session_id": "s1"})),
        envelope_reply("Earlier you asked for pet ideas.", &["Validate PawPlan", "Compare both ideas"]),
    ]));
    let cofounder = Cofounder::new(&config, llm.clone(), store).unwrap();
    cofounder.handle_turn("s1", "give me pet ideas").await.unwrap();
    cofounder.handle_turn("s1", "what did we talk about?").await.unwrap();

    let payload: Value = serde_json::from_str(llm.calls()[2].tool_outputs()[0]).unwrap();
    assert_eq!(payload["status"], "success");
    let history = payload["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[0]["content"], "give me pet ideas");
    assert_eq!(history[1]["role"], "agent");
}

#[tokio::test]
async fn test_empty_session_history_is_success() {
    let store: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::new());
    store
        .append("other", HistoryMessage::user("unrelated"))
        .await
        .unwrap();

    let llm = Arc::new(ScriptedProvider::new(vec![
        tool_call("get_session_history", json!({"session_id": "fresh"})),
        envelope_reply("This is our first conversation.", &["Share an idea", "Ask for ideas"]),
    ]));
    let cofounder = Cofounder::new(&offline_config(), llm.clone(), Some(store)).unwrap();
    cofounder.handle_turn("fresh", "what did we talk about?").await.unwrap();

    let payload: Value = serde_json::from_str(llm.calls()[1].tool_outputs()[0]).unwrap();
    assert_eq!(payload["status"], "success");
    assert_eq!(payload["history"], json!([]));
    assert_eq!(payload["message"], "No messages found for this session.");
}

#[tokio::test]
async fn test_concurrent_turns_on_one_session_are_serialised() {
    let llm = Arc::new(ScriptedProvider::repeating(
        r#"{"content": "Noted.", "next_actions": ["Keep going", "Ask for ideas"]}"#,
    ));
    let cofounder = Arc::new(team(llm));

    let mut handles = Vec::new();
    for i in 0..4 {
        let cofounder = cofounder.clone();
        handles.push(tokio::spawn(async move {
            cofounder.handle_turn("shared", &format!("message {}", i)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let transcript = cofounder.sessions().messages("shared").await.unwrap();
    assert_eq!(transcript.len(), 8);
    for pair in transcript.chunks(2) {
        assert_eq!(pair[0].role, "user");
        assert_eq!(pair[1].role, "agent");
    }
}

#[tokio::test]
async fn test_later_turns_see_earlier_context() {
    let llm = Arc::new(ScriptedProvider::repeating(
        r#"{"content": "Noted.", "next_actions": ["Keep going", "Ask for ideas"]}"#,
    ));
    let cofounder = team(llm.clone());
    cofounder.handle_turn("s1", "my name is Sam").await.unwrap();
    cofounder.handle_turn("s1", "what is my name?").await.unwrap();

    let second = &llm.calls()[1];
    // system, two earlier messages, the new turn
    assert_eq!(second.messages.len(), 4);
    assert_eq!(second.messages[1].content, "my name is Sam");
    assert_eq!(second.messages[3].content, "what is my name?");
}

#[tokio::test]
async fn test_sessions_readable_while_a_turn_runs() {
    let llm = Arc::new(
        ScriptedProvider::repeating(
            r#"{"content": "Noted.", "next_actions": ["Keep going", "Ask for ideas"]}"#,
        )
        .delayed(Duration::from_millis(800)),
    );
    let cofounder = Arc::new(team(llm));

    let running = {
        let cofounder = cofounder.clone();
        tokio::spawn(async move { cofounder.handle_turn("busy", "give me ideas").await })
    };
    // let the turn reach the model call
    tokio::time::sleep(Duration::from_millis(100)).await;

    let listed = tokio::time::timeout(Duration::from_millis(200), cofounder.sessions().list())
        .await
        .expect("listing waited for the turn");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].message_count, 0);

    let transcript = tokio::time::timeout(
        Duration::from_millis(200),
        cofounder.sessions().messages("busy"),
    )
    .await
    .expect("reading waited for the turn");
    assert_eq!(transcript.unwrap().len(), 0);

    running.await.unwrap().unwrap();
    assert_eq!(cofounder.sessions().messages("busy").await.unwrap().len(), 2);
}
