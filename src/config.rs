//! Session configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.

use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the config file used by the binary
pub const CONFIG_ENV: &str = "TERMINAL_QUEST_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub username: String,
    pub hostname: String,
    pub home: String,
    /// Secret accepted by the sudo prompt
    pub sudo_password: String,
    pub history_capacity: usize,
    pub max_password_attempts: u32,
    /// Populate the filesystem with the default world
    pub seed_world: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            username: "user".to_string(),
            hostname: "quest".to_string(),
            home: "/home/user".to_string(),
            sudo_password: "password".to_string(),
            history_capacity: 1000,
            max_password_attempts: 3,
            seed_world: true,
        }
    }
}

impl ShellConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load from the file named by [`CONFIG_ENV`], or use the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
