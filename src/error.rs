//! Error types.
//!
//! Failures fall into a small closed set so callers can tell a retryable
//! remote hiccup apart from a wrong passphrase or a broken settings file.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("{0}")]
    Command(String),
}

impl Error {
    /// Whether repeating the same operation may succeed.
    ///
    /// Only transport/service failures from the cloud provider and
    /// interrupted or timed-out I/O qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Remote(RemoteError::Service { .. }) => true,
            Error::Remote(RemoteError::Unavailable(_)) => false,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        Error::Io(std::io::Error::other(e))
    }
}

/// Key material and cipher failures.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("no key file at {0}")]
    MissingKey(PathBuf),

    #[error("key file already exists at {0}; refusing to overwrite it")]
    KeyExists(PathBuf),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("passphrase cannot be empty")]
    EmptyPassphrase,
}

/// Failures talking to the cloud provider.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("{operation} failed: {reason}")]
    Service {
        operation: &'static str,
        reason: String,
    },

    #[error("cloud client unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    pub(crate) fn service(operation: &'static str, reason: impl Into<String>) -> Self {
        RemoteError::Service {
            operation,
            reason: reason.into(),
        }
    }
}

/// Settings file failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid key path: '{0}'")]
    InvalidPath(String),

    #[error("'{0}' is not set")]
    NotSet(String),

    #[error("environment '{0}' is not initialized")]
    EnvironmentNotInitialized(String),

    #[error("unable to determine home directory")]
    NoHome,
}

/// Credential bundle failures.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("no credentials stored for environment '{0}'")]
    Empty(String),

    #[error("no vault yet: nothing has been stored under {0}")]
    NotCreated(PathBuf),

    #[error("category '{category}' is missing field '{field}'")]
    MissingField { category: String, field: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("malformed credential bundle: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
