//! State management module
//!
//! Agent registry, status machine, configs, and snapshot persistence.

pub mod agent_config;
pub mod app_state;
pub mod persistence;
pub mod status;

pub use agent_config::AgentConfig;
pub use app_state::{AgentHandle, AgentId, AppState};
pub use persistence::PersistenceError;
pub use status::{AgentStatus, IllegalTransition, StatusCell};
