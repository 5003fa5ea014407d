//! Client configuration, loaded from an optional TOML file.
//!
//! ```toml
//! broker_url = "ws://127.0.0.1:1883"
//! namespace = "gobblet/game"
//! bootstrap_timeout_ms = 2000
//! claim_window_ms = 500
//! inbound_queue = 64
//! enforce_unique_roles = true
//! # client_id = "a1b2c3d4e5f60718"
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use stackwire_session::{ClaimConfig, DEFAULT_NAMESPACE};
use stackwire_sync::SyncConfig;

/// Errors from loading a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for one `stackwire play` client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// WebSocket URL of the broker. Default: `ws://127.0.0.1:1883`.
    pub broker_url: String,

    /// Topic prefix shared by every client of a deployment.
    /// Default: `gobblet/game`.
    pub namespace: String,

    pub bootstrap_timeout_ms: u64,

    pub claim_window_ms: u64,

    pub inbound_queue: usize,

    /// Claim player roles so two clients can't play the same side.
    pub enforce_unique_roles: bool,

    /// Fixed client id. Set it to take back a role after a restart;
    /// left unset, a random id is generated per run.
    pub client_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let sync = SyncConfig::default();
        Self {
            broker_url: "ws://127.0.0.1:1883".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            bootstrap_timeout_ms: sync.bootstrap_timeout.as_millis() as u64,
            claim_window_ms: sync.claims.claim_window.as_millis() as u64,
            inbound_queue: sync.inbound_queue,
            enforce_unique_roles: sync.claims.enforce,
            client_id: None,
        }
    }
}

impl ClientConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()
    }

    /// Reads and parses `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), broker = %config.broker_url, "config loaded");
        Ok(config)
    }

    /// The file at `path` if one is given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Rejects values no client could run with.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(self.broker_url.starts_with("ws://") || self.broker_url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "broker_url must be a ws:// or wss:// URL, got {:?}",
                self.broker_url
            )));
        }
        if self.namespace.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("namespace is empty".to_string()));
        }
        if self.client_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(ConfigError::Invalid("client_id is empty".to_string()));
        }
        Ok(self)
    }

    /// The engine settings this config describes.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            bootstrap_timeout: Duration::from_millis(self.bootstrap_timeout_ms),
            inbound_queue: self.inbound_queue,
            claims: ClaimConfig {
                claim_window: Duration::from_millis(self.claim_window_ms),
                enforce: self.enforce_unique_roles,
            },
        }
    }
}
