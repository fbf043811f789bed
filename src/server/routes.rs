//! HTTP route handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::state::AppState;
use crate::agent::{AgentDescriptor, TurnOutcome};
use crate::core::CofounderError;
use crate::session::{SessionMessage, SessionSummary};

const INDEX_HTML: &str = include_str!("static/index.html");

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Error type for handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            hint: None,
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<CofounderError> for ApiError {
    fn from(err: CofounderError) -> Self {
        let status = match &err {
            CofounderError::InvalidInput(_) | CofounderError::Session(_) => StatusCode::BAD_REQUEST,
            CofounderError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            CofounderError::Llm(_) | CofounderError::Http(_) => StatusCode::BAD_GATEWAY,
            CofounderError::Timeout(..) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let api = ApiError::new(status, err.to_string());
        match err {
            CofounderError::Config(_) => api.hint("Check ~/.config/cofounder/config.toml and the environment"),
            _ => api,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("{} {}", self.status, self.message);
        } else {
            log::warn!("{} {}", self.status, self.message);
        }
        let body = ErrorBody {
            error: self.message,
            hint: self.hint,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Request body for a turn
#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub message: String,
}

/// Agent listing
#[derive(Debug, Serialize)]
pub struct AgentsResponse<'a> {
    pub root: &'a str,
    pub agents: Vec<&'a AgentDescriptor>,
}

/// Transcript of one session
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub session_id: String,
    pub messages: Vec<SessionMessage>,
}

/// Liveness plus the degraded capabilities
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let cofounder = &state.cofounder;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": cofounder.model(),
        "router": cofounder.router_name(),
        "history": cofounder.history_backend(),
        "search": state.config.search_available(),
    }))
}

pub async fn list_agents(State(state): State<AppState>) -> Response {
    let roster = state.cofounder.roster();
    Json(AgentsResponse {
        root: roster.root().name(),
        agents: roster.all().collect(),
    })
    .into_response()
}

pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.cofounder.sessions().list().await)
}

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionSummary>) {
    let session = state.cofounder.sessions().create().await;
    (StatusCode::CREATED, Json(session.summary().await))
}

pub async fn session_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    match state.cofounder.sessions().messages(&session_id).await {
        Some(messages) => Ok(Json(MessagesResponse {
            session_id,
            messages,
        })),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Session not found: {}", session_id),
        )
        .hint("Send a turn to the session, or POST /api/sessions to start one")),
    }
}

pub async fn post_turn(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "message must not be empty"));
    }
    log::debug!("Turn on session {}: {} chars", session_id, req.message.len());
    let outcome = state.cofounder.handle_turn(&session_id, &req.message).await?;
    Ok(Json(outcome))
}

/// Bundled chat page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
