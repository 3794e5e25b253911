//! Resolution helpers shared by CLI commands.
//!
//! Turns flags, environment variables and stored settings into the
//! explicit values the core layer expects.

use std::io::{self, IsTerminal};

use dialoguer::Password;
use tracing::debug;
use zeroize::Zeroizing;

use crate::cli::Environment;
use crate::core::cloud::CloudConfig;
use crate::core::paths::Paths;
use crate::core::settings::{EnvironmentSettings, Settings};
use crate::core::vault::{KeySource, Vault};
use crate::error::{CryptoError, Result, VaultError};

/// Per-invocation state.
pub struct Context {
    pub paths: Paths,
    passphrase: Option<Zeroizing<String>>,
}

impl Context {
    pub fn new(paths: Paths, passphrase: Option<String>) -> Self {
        Self {
            paths,
            passphrase: passphrase.map(Zeroizing::new),
        }
    }

    pub fn settings(&self) -> Result<Settings> {
        Settings::load(&self.paths.settings_file())
    }

    /// Settings of an environment that `init project` has set up.
    pub fn environment(&self, env: Environment) -> Result<EnvironmentSettings> {
        self.settings()?.require_environment(env.as_str())
    }

    /// Pick the key source for a command that writes to the vault.
    ///
    /// Rules:
    /// - An existing key file is always used as is
    /// - Otherwise `--passphrase` / `BOOTKIT_PASSPHRASE` derives a new key
    /// - Otherwise prompt when attached to a terminal
    pub fn key_source(&self) -> Result<KeySource> {
        let key_file = self.paths.key_file();
        if key_file.exists() {
            if self.passphrase.is_some() {
                debug!("key file exists, ignoring passphrase");
            }
            return Ok(KeySource::Persisted);
        }

        if let Some(passphrase) = &self.passphrase {
            return Ok(KeySource::Passphrase(passphrase.clone()));
        }

        if !io::stdin().is_terminal() {
            return Err(CryptoError::MissingKey(key_file).into());
        }

        let passphrase = Password::new()
            .with_prompt("New vault passphrase")
            .with_confirmation("Confirm passphrase", "passphrases do not match")
            .interact()?;
        Ok(KeySource::Passphrase(Zeroizing::new(passphrase)))
    }

    /// Open the vault for writing, creating the key if needed.
    pub fn vault_for_write(&self, env: Environment) -> Result<Vault> {
        let source = self.key_source()?;
        self.paths.ensure_root()?;
        Vault::open(&self.paths, env.as_str(), &source)
    }

    /// Open the vault for reading. Never creates a key.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::NotCreated` when no key has been created yet.
    pub fn vault_for_read(&self, env: Environment) -> Result<Vault> {
        if !self.paths.key_file().exists() {
            return Err(VaultError::NotCreated(self.paths.root().to_path_buf()).into());
        }
        Vault::open(&self.paths, env.as_str(), &KeySource::Persisted)
    }

    /// Cloud settings for an initialized environment.
    ///
    /// Environments set up with `--use-credentials` authenticate with the
    /// access keys in their vault unless a profile is given explicitly.
    pub fn cloud_config(
        &self,
        env: Environment,
        settings: &EnvironmentSettings,
        profile_override: Option<&str>,
        region_override: Option<&str>,
    ) -> Result<CloudConfig> {
        let credentials = if settings.use_credentials && profile_override.is_none() {
            let creds = self.vault_for_read(env)?.aws_credentials()?;
            Some(creds.ok_or_else(|| VaultError::Empty(env.to_string()))?)
        } else {
            None
        };

        Ok(CloudConfig::for_environment(
            settings,
            profile_override,
            region_override,
            credentials,
        ))
    }
}
