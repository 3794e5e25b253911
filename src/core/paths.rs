//! Locations of the per-user state files.
//!
//! Every operation receives a `Paths` value instead of reading HOME itself,
//! so tests point the whole tool at a temporary directory.

use std::path::{Path, PathBuf};

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Root of the per-user state directory and the files inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Use an explicit state directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the state directory: an override if given, otherwise
    /// `~/.bootkit`.
    pub fn resolve(home_override: Option<&Path>) -> Result<Self> {
        if let Some(dir) = home_override {
            return Ok(Self::new(dir));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
        Ok(Self::new(home.join(constants::HOME_DIR)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Settings file (`config.toml`).
    pub fn settings_file(&self) -> PathBuf {
        self.root.join(constants::SETTINGS_FILE)
    }

    /// Persisted symmetric key.
    pub fn key_file(&self) -> PathBuf {
        self.root.join(constants::KEY_FILE)
    }

    /// Encrypted credential bundle for one environment.
    pub fn credentials_file(&self, env: &str) -> PathBuf {
        self.root
            .join(format!("{}{}", env, constants::CREDENTIALS_SUFFIX))
    }

    /// Create the state directory if needed.
    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}
