//! Application state management
//!
//! Registry of room agents plus the snapshot persistence hooks.

use crate::agent::Agent;
use crate::config::AutomationConfig;
use crate::state::agent_config::AgentConfig;
use crate::state::persistence::RegistrySnapshot;
use crate::state::status::{AgentStatus, StatusCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Unique identifier for an agent
pub type AgentId = String;

/// Registry entry for one agent.
///
/// The config is immutable after creation and readable without touching
/// the agent mutex; the status cell is shared with the agent itself. The
/// mutex serializes lifecycle and interaction calls per agent — calls
/// against different agents stay independent.
pub struct AgentHandle {
    /// The agent's persisted configuration
    pub config: AgentConfig,
    /// Shared lifecycle status
    pub status: Arc<StatusCell>,
    /// The agent, behind its per-agent exclusion lock
    pub agent: Arc<Mutex<Agent>>,
}

/// Main application state: the agent registry and its snapshot location
pub struct AppState {
    /// Registry of all agents (id -> handle)
    pub agents: HashMap<AgentId, AgentHandle>,
    snapshot_path: PathBuf,
    automation: AutomationConfig,
    invite_host: String,
}

impl AppState {
    /// Create an empty registry persisted at `snapshot_path`
    pub fn new(snapshot_path: PathBuf, automation: AutomationConfig, invite_host: String) -> Self {
        Self {
            agents: HashMap::new(),
            snapshot_path,
            automation,
            invite_host,
        }
    }

    /// Generate a new unique agent id
    pub fn generate_id() -> AgentId {
        Uuid::new_v4().to_string()
    }

    /// Validate the config, register an idle agent, persist the snapshot.
    /// Does not start the agent. Returns the generated id.
    pub fn create_agent(&mut self, config: AgentConfig) -> Result<AgentId, String> {
        config.validate()?;
        let id = Self::generate_id();
        self.insert_handle(id.clone(), config);
        self.save();
        Ok(id)
    }

    /// Remove an agent from the registry and persist the snapshot.
    /// The caller is responsible for stopping it first (best-effort).
    pub fn remove_agent(&mut self, id: &AgentId) -> Option<AgentHandle> {
        let removed = self.agents.remove(id);
        if removed.is_some() {
            self.save();
        }
        removed
    }

    /// Look up an agent handle
    pub fn get(&self, id: &AgentId) -> Option<&AgentHandle> {
        self.agents.get(id)
    }

    /// Number of registered agents
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// All handles sorted by agent name, then id, for stable listings
    pub fn agents_list(&self) -> Vec<(&AgentId, &AgentHandle)> {
        let mut entries: Vec<(&AgentId, &AgentHandle)> = self.agents.iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| {
            a.config
                .name
                .cmp(&b.config.name)
                .then_with(|| a_id.cmp(b_id))
        });
        entries
    }

    /// Write the `{id -> config}` snapshot. Live sessions are never
    /// persisted. A failed write is logged; the in-memory mutation that
    /// triggered it is kept.
    pub fn save(&self) {
        let configs: HashMap<AgentId, AgentConfig> = self
            .agents
            .iter()
            .map(|(id, handle)| (id.clone(), handle.config.clone()))
            .collect();
        if let Err(e) = RegistrySnapshot::save_to_file(&configs, &self.snapshot_path) {
            error!(path = %self.snapshot_path.display(), error = %e, "Snapshot save failed");
        }
    }

    /// Rebuild the registry from the snapshot, one idle agent per saved
    /// config. A missing or empty file yields an empty registry; a
    /// malformed one is logged and also yields an empty registry, never a
    /// partial one. Returns the number of agents loaded.
    pub fn load(&mut self) -> usize {
        let configs = match RegistrySnapshot::load_from_file(&self.snapshot_path) {
            Ok(configs) => configs,
            Err(e) => {
                warn!(path = %self.snapshot_path.display(), error = %e, "Snapshot load failed, starting empty");
                return 0;
            }
        };
        self.agents.clear();
        let count = configs.len();
        for (id, config) in configs {
            self.insert_handle(id, config);
        }
        if count > 0 {
            info!(count, path = %self.snapshot_path.display(), "Registry loaded");
        }
        count
    }

    fn insert_handle(&mut self, id: AgentId, config: AgentConfig) {
        let status = Arc::new(StatusCell::default());
        let agent = Agent::new(
            id.clone(),
            config.clone(),
            self.automation.clone(),
            self.invite_host.clone(),
            status.clone(),
        );
        self.agents.insert(
            id,
            AgentHandle {
                config,
                status,
                agent: Arc::new(Mutex::new(agent)),
            },
        );
    }
}
