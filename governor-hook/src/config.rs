//! Hook configuration
//!
//! Handles:
//! - Proxmox API credentials and endpoint
//! - Governors applied while the VM runs and once it stops
//! - Validation at load time (unknown keys and governor names rejected)

use crate::governor::GovernorState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    /// Proxmox user with VM.Audit on the cluster, e.g. `root@pam`
    pub user: String,
    pub password: String,
    #[serde(default = "default_started_state")]
    pub started_state: GovernorState,
    #[serde(default = "default_stopped_state")]
    pub stopped_state: GovernorState,
    /// Cluster node the API requests go to
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Off by default since `localhost` serves the self-signed PVE certificate
    #[serde(default)]
    pub verify_tls: bool,
}

fn default_started_state() -> GovernorState {
    GovernorState::Performance
}

fn default_stopped_state() -> GovernorState {
    GovernorState::Schedutil
}

fn default_hostname() -> String {
    "localhost".to_string()
}

impl fmt::Debug for HookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("started_state", &self.started_state)
            .field("stopped_state", &self.stopped_state)
            .field("hostname", &self.hostname)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

impl HookConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: HookConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.user.trim().is_empty() {
            return Err(ConfigError::Invalid("user must not be empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Invalid("password must not be empty".to_string()));
        }
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::Invalid("hostname must not be empty".to_string()));
        }
        Ok(())
    }
}
