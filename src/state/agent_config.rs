//! Agent configuration module
//!
//! Defines the persisted, user-supplied configuration of a room agent.
//! Config is immutable after the agent is created; only configs survive a
//! restart (live sessions are never resumed).

use serde::{Deserialize, Serialize};

/// Configuration for one room agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    /// Display name of the agent
    #[serde(default)]
    pub name: String,
    /// URL of the conference room the agent joins on start
    pub start_url: String,
    /// Launch the browser headless
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Launch with audio output muted
    #[serde(default = "default_true")]
    pub mute_audio: bool,
    /// Evaluate and log the page title right after joining
    #[serde(default)]
    pub scrape_on_start: bool,
}

fn default_true() -> bool {
    true
}

impl AgentConfig {
    /// Create a configuration for a room URL with default flags
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            start_url: start_url.into(),
            headless: true,
            mute_audio: true,
            scrape_on_start: false,
        }
    }

    /// Validate the configuration
    /// Returns Ok(()) if valid, Err with message if invalid
    pub fn validate(&self) -> Result<(), String> {
        if self.start_url.trim().is_empty() {
            return Err("Start URL cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_defaults() {
        let config = AgentConfig::new("https://meet.example.com/room/1");
        assert!(config.headless);
        assert!(config.mute_audio);
        assert!(!config.scrape_on_start);
        assert!(config.name.is_empty());
    }

    #[test]
    fn test_config_validate() {
        let mut config = AgentConfig::new("https://meet.example.com/room/1");
        assert!(config.validate().is_ok());

        config.start_url = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AgentConfig::new("https://meet.example.com/room/42");
        config.name = "observer".to_string();
        config.headless = false;
        config.scrape_on_start = true;

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AgentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_deserialize_defaults_missing_flags() {
        // Old snapshots may carry only the URL
        let config: AgentConfig =
            serde_json::from_str(r#"{"start_url":"https://meet.example.com/r"}"#).unwrap();
        assert!(config.headless);
        assert!(config.mute_audio);
        assert!(!config.scrape_on_start);
    }
}
