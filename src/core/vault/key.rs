//! Key acquisition.
//!
//! The vault key is 32 bytes derived once from a passphrase with
//! PBKDF2-HMAC-SHA256 and then persisted as URL-safe base64. The key file is
//! the durable secret: the salt is discarded after derivation, so losing the
//! key file means losing every bundle encrypted with it.

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::RngCore;
use sha2::Sha256;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::core::constants::{KDF_ITERATIONS, KEY_LEN, SALT_LEN};
use crate::core::files;
use crate::error::{CryptoError, Result};

/// Where the vault key comes from.
///
/// The caller picks the variant; nothing is inferred from whether the key
/// file happens to exist.
pub enum KeySource {
    /// Derive a fresh key from this passphrase and persist it.
    Passphrase(Zeroizing<String>),
    /// Read the previously persisted key.
    Persisted,
}

impl KeySource {
    pub fn passphrase(passphrase: impl Into<String>) -> Self {
        KeySource::Passphrase(Zeroizing::new(passphrase.into()))
    }
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Passphrase(_) => f.write_str("Passphrase(..)"),
            KeySource::Persisted => f.write_str("Persisted"),
        }
    }
}

/// Symmetric key material, wiped on drop.
#[derive(Clone)]
pub struct Key(Zeroizing<[u8; KEY_LEN]>);

impl Key {
    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` unless exactly 32 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("expected {} bytes, got {}", KEY_LEN, bytes.len()))
        })?;
        Ok(Self(Zeroizing::new(array)))
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self(bytes)
    }

    /// Decode the key file representation.
    pub fn decode(encoded: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(encoded)
            .map_err(|_| CryptoError::InvalidKey("key file is not text".into()))?;
        let raw = Zeroizing::new(
            URL_SAFE
                .decode(text.trim())
                .map_err(|e| CryptoError::InvalidKey(format!("invalid base64: {}", e)))?,
        );
        Self::from_bytes(&raw)
    }

    /// Key file representation (URL-safe base64).
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(URL_SAFE.encode(self.as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    /// Derive a key from a passphrase and salt.
    pub fn derive(passphrase: &str, salt: &[u8]) -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, KDF_ITERATIONS, &mut bytes[..]);
        Self(bytes)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Key {}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Key(..)")
    }
}

/// Obtain the vault key from `source`, using `key_file` for persistence.
///
/// # Errors
///
/// - `CryptoError::MissingKey` for `Persisted` when the file is absent.
/// - `CryptoError::KeyExists` for `Passphrase` when a key file is already
///   there; deriving over it would orphan every existing bundle.
/// - `CryptoError::EmptyPassphrase` for an empty passphrase.
pub fn acquire(source: &KeySource, key_file: &Path) -> Result<Key> {
    match source {
        KeySource::Persisted => load(key_file),
        KeySource::Passphrase(passphrase) => create(passphrase, key_file),
    }
}

fn load(key_file: &Path) -> Result<Key> {
    debug!(path = %key_file.display(), "loading persisted key");

    if !key_file.exists() {
        return Err(CryptoError::MissingKey(key_file.to_path_buf()).into());
    }
    files::warn_if_exposed(key_file);

    let encoded = Zeroizing::new(std::fs::read(key_file)?);
    Key::decode(&encoded)
}

fn create(passphrase: &str, key_file: &Path) -> Result<Key> {
    if passphrase.is_empty() {
        return Err(CryptoError::EmptyPassphrase.into());
    }
    if key_file.exists() {
        return Err(CryptoError::KeyExists(key_file.to_path_buf()).into());
    }

    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    debug!(iterations = KDF_ITERATIONS, "deriving key from passphrase");
    let key = Key::derive(passphrase, &salt);

    files::write_private(key_file, key.encode().as_bytes(), true).map_err(|e| match e {
        crate::error::Error::Io(io) if io.kind() == std::io::ErrorKind::AlreadyExists => {
            CryptoError::KeyExists(key_file.to_path_buf()).into()
        }
        other => other,
    })?;

    info!(path = %key_file.display(), "persisted new key");
    Ok(key)
}
