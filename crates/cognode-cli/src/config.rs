//! Configuration loading.
//!
//! Settings come from a JSON file, then environment variables override the
//! model endpoint and credentials. API keys are read from the file or the
//! environment but never written back out.

use cognode_model::{ModelConfig, RetryPolicy};
use cognode_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "cognode.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("no API key configured; set COGNODE_API_KEY or model.api_key")]
    MissingApiKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub queue_depth: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            host: defaults.addr.ip().to_string(),
            port: defaults.addr.port(),
            path: defaults.path,
            queue_depth: defaults.queue_depth,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub retry: RetryPolicy,
    pub server: ServerSection,
}

impl Config {
    /// Loads the first config found, then applies environment overrides.
    ///
    /// An explicit path must exist. Otherwise `./cognode.json` and then
    /// `<config dir>/cognode/config.json` are tried, falling back to
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::locate(explicit) {
            Some(path) => {
                debug!(path = %path.display(), "Loading config");
                Self::from_file(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("cognode").join("config.json"))
            .filter(|path| path.is_file())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `COGNODE_*` overrides. `OPENAI_API_KEY` is accepted as a
    /// fallback key.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(key) = set("COGNODE_API_KEY").or_else(|| set("OPENAI_API_KEY")) {
            self.model.api_key = Some(key);
        }
        if let Some(model) = set("COGNODE_MODEL") {
            self.model.model = model;
        }
        if let Some(base) = set("COGNODE_API_BASE") {
            self.model.api_base = Some(base);
        }
    }

    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        match self.model.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let raw = format!("{}:{}", self.server.host, self.server.port);
        let addr: SocketAddr = raw
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(raw.clone()))?;
        Ok(ServerConfig {
            addr,
            path: self.server.path.clone(),
            queue_depth: self.server.queue_depth,
        })
    }
}
