//! Registry persistence module
//!
//! Saves and loads the agent config snapshot; live sessions are never
//! persisted.

use super::agent_config::AgentConfig;
use super::app_state::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error types for persistence operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Snapshot content is structurally invalid
    #[error("Invalid snapshot: {0}")]
    InvalidData(String),
}

/// On-disk snapshot format
/// Maps agent id to its config; version field reserved for migrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotData {
    version: u32,
    agents: HashMap<AgentId, AgentConfig>,
}

/// Agent snapshot persistence operations
pub struct RegistrySnapshot;

impl RegistrySnapshot {
    /// Save agent configs to a JSON file.
    ///
    /// The write is atomic: serialized to a temp file in the same directory,
    /// then renamed over the target, so a crash mid-write cannot tear the
    /// snapshot.
    pub fn save_to_file<P: AsRef<Path>>(
        configs: &HashMap<AgentId, AgentConfig>,
        path: P,
    ) -> Result<(), PersistenceError> {
        let data = SnapshotData {
            version: 1,
            agents: configs.clone(),
        };
        let json = serde_json::to_string_pretty(&data)?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load agent configs from a JSON file.
    ///
    /// A missing or empty file yields an empty map. A malformed file is an
    /// error; the caller falls back to an empty registry rather than a
    /// partial one.
    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<HashMap<AgentId, AgentConfig>, PersistenceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let json = fs::read_to_string(path)?;
        if json.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let data: SnapshotData = serde_json::from_str(&json)?;
        if data.version != 1 {
            return Err(PersistenceError::InvalidData(format!(
                "Unsupported snapshot version: {}",
                data.version
            )));
        }

        for (id, config) in &data.agents {
            if config.validate().is_err() {
                return Err(PersistenceError::InvalidData(format!(
                    "Agent {} has an empty start URL",
                    id
                )));
            }
        }

        Ok(data.agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_config(url: &str) -> AgentConfig {
        AgentConfig::new(url)
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agents.json");

        let mut configs = HashMap::new();
        configs.insert(
            "agent-1".to_string(),
            sample_config("https://meet.example.com/room/a"),
        );
        let mut second = sample_config("https://meet.example.com/room/b");
        second.headless = false;
        second.scrape_on_start = true;
        configs.insert("agent-2".to_string(), second);

        RegistrySnapshot::save_to_file(&configs, &path).unwrap();
        let loaded = RegistrySnapshot::load_from_file(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded, configs);
    }

    #[test]
    fn test_load_missing_file_yields_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded = RegistrySnapshot::load_from_file(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_empty_file_yields_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agents.json");
        fs::write(&path, "  \n").unwrap();
        let loaded = RegistrySnapshot::load_from_file(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agents.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(RegistrySnapshot::load_from_file(&path).is_err());
    }

    #[test]
    fn test_load_rejects_empty_start_url() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agents.json");
        fs::write(
            &path,
            r#"{"version":1,"agents":{"a":{"start_url":""}}}"#,
        )
        .unwrap();
        assert!(matches!(
            RegistrySnapshot::load_from_file(&path),
            Err(PersistenceError::InvalidData(_))
        ));
    }

    #[test]
    fn test_save_overwrite_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agents.json");

        let mut configs = HashMap::new();
        configs.insert(
            "agent-1".to_string(),
            sample_config("https://meet.example.com/room/a"),
        );
        RegistrySnapshot::save_to_file(&configs, &path).unwrap();
        configs.remove("agent-1");
        RegistrySnapshot::save_to_file(&configs, &path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert!(RegistrySnapshot::load_from_file(&path).unwrap().is_empty());
    }
}
