//! Server application state shared across handlers

use std::sync::Arc;

use crate::agent::Cofounder;
use crate::core::Config;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The agent team
    pub cofounder: Arc<Cofounder>,
    /// Configuration the server was started with
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(cofounder: Arc<Cofounder>, config: Config) -> Self {
        Self {
            cofounder,
            config: Arc::new(config),
        }
    }
}
