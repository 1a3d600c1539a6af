//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/riftwatch/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/riftwatch/` (~/.config/riftwatch/)
//! - State/Logs: `$XDG_STATE_HOME/riftwatch/` (~/.local/state/riftwatch/)
//!
//! Nothing is persisted between sessions, so there is no data directory.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Backend HTTP collaborator
    #[serde(default)]
    pub backend: BackendConfig,

    /// Push channel
    #[serde(default)]
    pub push: PushConfig,

    /// Notification timings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the companion backend (e.g., `http://127.0.0.1:5000`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Matches requested per player (clamped to 1..=200)
    #[serde(default = "default_history_count")]
    pub history_count: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            history_count: default_history_count(),
        }
    }
}

impl BackendConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "backend.base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "backend.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// `history_count` clamped to what the backend accepts.
    pub fn effective_history_count(&self) -> u32 {
        self.history_count.clamp(1, 200)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_max_retries() -> usize {
    1
}

fn default_history_count() -> u32 {
    20
}

/// Push channel configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PushConfig {
    /// Socket.IO WebSocket URL; derived from `backend.base_url` when unset
    pub url: Option<String>,

    /// Initial reconnect delay in seconds (doubles up to 30)
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: None,
            reconnect_secs: default_reconnect_secs(),
        }
    }
}

fn default_reconnect_secs() -> u64 {
    2
}

/// Notification timings
#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// How long a notice stays visible; `<= 0` keeps it until replaced
    #[serde(default = "default_notice_ms")]
    pub duration_ms: i64,

    /// How long a refused-action notice stays visible
    #[serde(default = "default_refusal_ms")]
    pub refusal_duration_ms: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_notice_ms(),
            refusal_duration_ms: default_refusal_ms(),
        }
    }
}

fn default_notice_ms() -> i64 {
    4000
}

fn default_refusal_ms() -> i64 {
    5000
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.backend.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/riftwatch/config.toml` (~/.config/riftwatch/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("riftwatch").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/riftwatch/` (~/.local/state/riftwatch/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("riftwatch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.backend.max_retries, 1);
        assert_eq!(config.backend.history_count, 20);
        assert!(config.push.url.is_none());
        assert_eq!(config.notifications.duration_ms, 4000);
        assert_eq!(config.logging.level, "info");
        assert!(config.backend.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[backend]
base_url = "http://localhost:8080"
history_count = 10

[push]
url = "ws://localhost:8080/socket.io/?EIO=4&transport=websocket"

[notifications]
duration_ms = 0

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.backend.base_url, "http://localhost:8080");
        assert_eq!(config.backend.history_count, 10);
        assert_eq!(config.backend.timeout_secs, 10);
        assert!(config.push.url.is_some());
        assert_eq!(config.push.reconnect_secs, 2);
        assert_eq!(config.notifications.duration_ms, 0);
        assert_eq!(config.notifications.refusal_duration_ms, 5000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_backend_validation() {
        let config = BackendConfig {
            base_url: "localhost:5000".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BackendConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_history_count_clamped() {
        let mut config = BackendConfig::default();
        config.history_count = 0;
        assert_eq!(config.effective_history_count(), 1);
        config.history_count = 500;
        assert_eq!(config.effective_history_count(), 200);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\nbase_url = \"https://example.com\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.backend.base_url, "https://example.com");
    }

    #[test]
    fn test_load_from_rejects_invalid_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\nbase_url = \"ftp://example.com\"").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_state_dir_name() {
        assert!(Config::state_dir().ends_with("riftwatch"));
    }
}
