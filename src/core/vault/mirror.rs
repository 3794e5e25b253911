//! Managed secret store seam.
//!
//! The vault mirrors its plaintext bundle into an external secret store so
//! other systems can read it. AWS Secrets Manager implements this in
//! `core::cloud`; tests use an in-memory store.

use crate::error::Result;

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// A named string secret in an external service.
pub trait SecretStore {
    /// Create the secret, or overwrite its value if it already exists.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the service call fails.
    fn upsert_secret(&self, name: &str, value: &str) -> Result<Upsert>;
}

/// In-memory secret store for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub secrets: std::cell::RefCell<std::collections::BTreeMap<String, String>>,
    pub fail: bool,
}

#[cfg(test)]
impl SecretStore for MemoryStore {
    fn upsert_secret(&self, name: &str, value: &str) -> Result<Upsert> {
        if self.fail {
            return Err(crate::error::RemoteError::service("PutSecret", "service unavailable").into());
        }
        let previous = self
            .secrets
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        Ok(if previous.is_some() {
            Upsert::Updated
        } else {
            Upsert::Created
        })
    }
}
