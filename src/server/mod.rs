//! HTTP server
//!
//! JSON API over the cofounder team plus an optional bundled chat page.

pub mod routes;
pub mod state;

pub use routes::ApiError;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue,
    },
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::Cofounder;
use crate::core::config::ServerConfig;
use crate::core::{CofounderError, Config, Result};

/// CORS policy from the configured origins; "*" allows any origin
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    if config.allow_origins.is_empty() || config.allow_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health))
        .route("/api/agents", get(routes::list_agents))
        .route(
            "/api/sessions",
            get(routes::list_sessions).post(routes::create_session),
        )
        .route("/api/sessions/:id/messages", get(routes::session_messages))
        .route("/api/sessions/:id/turns", post(routes::post_turn));

    if state.config.server.web_ui {
        app = app.route("/", get(routes::index));
    }

    let cors = cors_layer(&state.config.server);
    app.layer(cors).with_state(state)
}

/// Serve until Ctrl-C
pub async fn run_server(config: Config, cofounder: Arc<Cofounder>) -> Result<()> {
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| CofounderError::config(format!("Invalid address {}: {}", config.server_addr(), e)))?;

    let web_ui = config.server.web_ui;
    let app = router(AppState::new(cofounder, config));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| CofounderError::with_context(format!("Failed to bind to {}", addr), e))?;

    log::info!("Server listening on http://{}", addr);
    if web_ui {
        log::info!("Web UI at http://{}/", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutdown signal received, stopping server..."),
        Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
    }
}
