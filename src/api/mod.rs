//! API module
//!
//! HTTP request handlers for agent management, the conferencing proxy,
//! and the machine snapshot.

pub mod agents;
pub mod conference;
pub mod machine;

use crate::config::Config;
use crate::state::AppState;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared context handed to every handler
#[derive(Clone)]
pub struct AppCtx {
    /// Registry state behind the process-wide lock
    pub state: Arc<RwLock<AppState>>,
    /// Outbound HTTP client (conference proxy, license check)
    pub http: reqwest::Client,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppCtx {
    /// Build the context from loaded configuration
    pub fn new(config: Config) -> Self {
        let state = AppState::new(
            config.persistence.snapshot_path(),
            config.automation.clone(),
            config.conference.invite_host.clone(),
        );
        Self {
            state: Arc::new(RwLock::new(state)),
            http: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }
}
