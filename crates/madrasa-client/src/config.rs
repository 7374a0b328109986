//! Client configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use madrasa_core::identity::Account;

/// Top-level madrasa client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the platform API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Signed-in account email. Leave unset to take tests as a guest.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name for the signed-in account.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Directory for durable client state (the guest device id).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    dirs_path().unwrap_or_else(|| PathBuf::from(".madrasa"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            email: None,
            display_name: None,
            request_timeout_secs: default_timeout(),
            data_dir: default_data_dir(),
        }
    }
}

impl ClientConfig {
    /// The signed-in account, when both email and display name are set.
    pub fn account(&self) -> Option<Account> {
        match (&self.email, &self.display_name) {
            (Some(email), Some(display_name)) => Some(Account {
                email: email.clone(),
                display_name: display_name.clone(),
            }),
            _ => None,
        }
    }

    /// Where the guest device id is persisted.
    pub fn device_id_path(&self) -> PathBuf {
        self.data_dir.join("device_id")
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `madrasa.toml` in the current directory
/// 2. `~/.config/madrasa/config.toml`
///
/// Environment variable override: `MADRASA_BASE_URL`.
pub fn load_config() -> Result<ClientConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("madrasa.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ClientConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Ok(url) = std::env::var("MADRASA_BASE_URL") {
        config.base_url = url;
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("madrasa"))
}
