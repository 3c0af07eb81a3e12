use crate::error::{Result, StoreError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of `trac.toml`. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TracConfig {
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub journal_mode: String,
    pub synchronous: String,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("trac.sqlite3"),
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

impl TracConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|err| StoreError::Config(format!("{}: {err}", path.display())))
    }

    /// Like [`TracConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
