//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
    /// Browser automation configuration
    pub automation: AutomationConfig,
    /// Conferencing backend configuration
    pub conference: ConferenceConfig,
    /// License validation configuration
    pub license: LicenseConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Base directory for the registry snapshot
    pub data_dir: PathBuf,
}

impl PersistenceConfig {
    /// Path of the registry snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("agents.json")
    }
}

/// Browser automation configuration
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// Explicit Chrome executable; when unset, known install paths are
    /// probed and chromiumoxide's own detection is the fallback
    pub chrome_path: Option<String>,
    /// Per-step bound for UI element waits
    pub ui_wait_timeout: Duration,
    /// Settle delay after the pane toggle keystroke
    pub pane_settle: Duration,
    /// Bound for the initial room navigation
    pub nav_timeout: Duration,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            ui_wait_timeout: Duration::from_millis(5000),
            pane_settle: Duration::from_millis(700),
            nav_timeout: Duration::from_secs(30),
        }
    }
}

/// Conferencing backend configuration
#[derive(Debug, Clone)]
pub struct ConferenceConfig {
    /// Base URL of the conferencing REST API the proxy forwards to
    pub api_url: String,
    /// Host recognized in invite links copied from the client
    pub invite_host: String,
}

/// License validation configuration
#[derive(Debug, Clone)]
pub struct LicenseConfig {
    /// Validation endpoint
    pub api_url: String,
    /// License key; when unset the check is skipped with a warning
    pub key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            persistence: PersistenceConfig {
                data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| {
                    if let Some(home) = env::var_os("HOME") {
                        PathBuf::from(home).join(".room-agent")
                    } else {
                        PathBuf::from(".room-agent")
                    }
                }),
            },
            automation: AutomationConfig {
                chrome_path: env::var("CHROME_PATH").ok(),
                ui_wait_timeout: Duration::from_millis(env_ms("UI_WAIT_TIMEOUT_MS", 5000)),
                pane_settle: Duration::from_millis(env_ms("PANE_SETTLE_MS", 700)),
                nav_timeout: Duration::from_millis(env_ms("NAV_TIMEOUT_MS", 30_000)),
            },
            conference: ConferenceConfig {
                api_url: env::var("CONFERENCE_API_URL")
                    .unwrap_or_else(|_| "https://api.meet.example.com/v1".to_string()),
                invite_host: env::var("CONFERENCE_HOST")
                    .unwrap_or_else(|_| "meet.example.com".to_string()),
            },
            license: LicenseConfig {
                api_url: env::var("LICENSE_API_URL")
                    .unwrap_or_else(|_| "https://license.meet.example.com/check".to_string()),
                key: env::var("LICENSE_KEY").ok(),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_ms(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
