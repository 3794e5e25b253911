//! Credential vault.
//!
//! Protects one environment's secret bundle at rest. The bundle is
//! serialized to canonical JSON, sealed with AES-256-GCM under the vault
//! key and written to `<home>/<env>_credentials.enc` with mode 0600.
//!
//! Every write replaces the whole file. There is no locking: two processes
//! updating the same environment at once can lose one update.

mod bundle;
mod cipher;
mod key;
mod mirror;

use std::path::PathBuf;

use tracing::{debug, info};

use crate::core::constants;
use crate::core::files;
use crate::core::paths::Paths;
use crate::error::{Result, VaultError};

pub use bundle::{mask, AwsCredentials, Bundle, Category, DatabaseCredentials};
pub use cipher::{open, seal};
pub use key::{acquire, Key, KeySource};
pub use mirror::{SecretStore, Upsert};

#[cfg(test)]
pub use mirror::MemoryStore;

/// Encrypted credential storage for one environment.
#[derive(Debug)]
pub struct Vault {
    file: PathBuf,
    env: String,
    key: Key,
}

impl Vault {
    /// Open the vault of `env`, acquiring the key from `source`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` if the key cannot be acquired.
    pub fn open(paths: &Paths, env: &str, source: &KeySource) -> Result<Self> {
        let key = acquire(source, &paths.key_file())?;
        Ok(Self::with_key(paths, env, key))
    }

    /// Open the vault of `env` with a key the caller already holds.
    pub fn with_key(paths: &Paths, env: &str, key: Key) -> Self {
        Self {
            file: paths.credentials_file(env),
            env: env.to_string(),
            key,
        }
    }

    /// Environment name.
    pub fn env(&self) -> &str {
        &self.env
    }

    /// Path of the encrypted credential file.
    pub fn file(&self) -> &std::path::Path {
        &self.file
    }

    /// Encrypt `bundle` and replace the credential file.
    pub fn save(&self, bundle: &Bundle) -> Result<()> {
        debug!(env = %self.env, categories = bundle.len(), "saving bundle");

        let plaintext = zeroize::Zeroizing::new(bundle.to_json()?);
        let token = seal(&self.key, plaintext.as_bytes())?;
        files::write_private(&self.file, token.as_bytes(), false)?;

        info!(path = %self.file.display(), "credentials saved");
        Ok(())
    }

    /// Decrypt the credential file.
    ///
    /// Returns `Ok(None)` if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Decrypt` if the key is wrong or the file was
    /// modified; nothing is returned from a file that fails to verify.
    pub fn load(&self) -> Result<Option<Bundle>> {
        if !self.file.exists() {
            debug!(path = %self.file.display(), "no credential file");
            return Ok(None);
        }

        let token = std::fs::read(&self.file)?;
        let plaintext = open(&self.key, &token)?;
        let bundle = Bundle::from_json(&plaintext)?;

        debug!(env = %self.env, categories = bundle.len(), "bundle loaded");
        Ok(Some(bundle))
    }

    /// Replace one category, keeping the others, and save.
    ///
    /// Returns the merged bundle.
    pub fn update(&self, category: &str, fields: Category) -> Result<Bundle> {
        let mut bundle = self.load()?.unwrap_or_default();
        bundle.insert(category, fields);
        self.save(&bundle)?;
        Ok(bundle)
    }

    pub fn store_aws_credentials(&self, credentials: &AwsCredentials) -> Result<()> {
        self.update(AwsCredentials::CATEGORY, credentials.to_category())?;
        Ok(())
    }

    pub fn aws_credentials(&self) -> Result<Option<AwsCredentials>> {
        self.load()?
            .as_ref()
            .and_then(|b| b.get(AwsCredentials::CATEGORY))
            .map(AwsCredentials::from_category)
            .transpose()
    }

    pub fn store_database_credentials(&self, credentials: &DatabaseCredentials) -> Result<()> {
        self.update(DatabaseCredentials::CATEGORY, credentials.to_category())?;
        Ok(())
    }

    pub fn database_credentials(&self) -> Result<Option<DatabaseCredentials>> {
        self.load()?
            .as_ref()
            .and_then(|b| b.get(DatabaseCredentials::CATEGORY))
            .map(DatabaseCredentials::from_category)
            .transpose()
    }

    /// Copy the full plaintext bundle into `store` as one JSON secret named
    /// `{org}-{env}-database-credentials`.
    ///
    /// The local file is left as it is whether or not the upload succeeds.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Empty` if nothing is stored locally, or the
    /// store's `RemoteError`.
    pub fn mirror(&self, store: &dyn SecretStore, org: &str) -> Result<(String, Upsert)> {
        let bundle = match self.load()? {
            Some(b) if !b.is_empty() => b,
            _ => return Err(VaultError::Empty(self.env.clone()).into()),
        };

        let name = constants::mirror_secret_name(org, &self.env);
        let payload = zeroize::Zeroizing::new(bundle.to_json()?);
        let outcome = store.upsert_secret(&name, &payload)?;

        info!(secret = %name, ?outcome, "mirrored credentials");
        Ok((name, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CryptoError, Error};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Paths, Vault) {
        let tmp = TempDir::new().unwrap();
        let paths = Paths::new(tmp.path());
        let vault = Vault::with_key(&paths, "dev", Key::generate());
        (tmp, paths, vault)
    }

    fn aws() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIAEXAMPLE".into(),
            secret_access_key: "abc".into(),
            session_token: None,
        }
    }

    fn db(password: &str) -> DatabaseCredentials {
        DatabaseCredentials {
            username: "app".into(),
            password: password.into(),
            host: "db.internal".into(),
            port: 5432,
            database_name: "main".into(),
        }
    }

    #[test]
    fn test_load_without_file_is_none() {
        let (_tmp, _paths, vault) = setup();
        assert!(vault.load().unwrap().is_none());
        assert!(vault.aws_credentials().unwrap().is_none());
    }

    #[test]
    fn test_empty_bundle_roundtrip() {
        let (_tmp, _paths, vault) = setup();
        vault.save(&Bundle::new()).unwrap();
        assert_eq!(vault.load().unwrap(), Some(Bundle::new()));
    }

    #[test]
    fn test_store_access_keys_scenario() {
        let (_tmp, _paths, vault) = setup();
        vault.store_aws_credentials(&aws()).unwrap();

        assert!(vault.file().exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(vault.file()).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }

        let loaded = vault.aws_credentials().unwrap().unwrap();
        assert_eq!(loaded.access_key_id, "AKIAEXAMPLE");
        assert_eq!(loaded.secret_access_key, "abc");
        assert_eq!(vault.load().unwrap().unwrap().get("aws").unwrap().len(), 2);
    }

    #[test]
    fn test_database_after_access_keys_keeps_both() {
        let (_tmp, _paths, vault) = setup();
        vault.store_aws_credentials(&aws()).unwrap();
        vault.store_database_credentials(&db("first")).unwrap();

        let bundle = vault.load().unwrap().unwrap();
        assert!(bundle.get("aws").is_some());
        assert!(bundle.get("database").is_some());
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn test_second_database_store_keeps_latest() {
        let (_tmp, _paths, vault) = setup();
        vault.store_database_credentials(&db("first")).unwrap();

        let mut replacement = db("second");
        replacement.host = "replica.internal".into();
        vault.store_database_credentials(&replacement).unwrap();

        assert_eq!(vault.database_credentials().unwrap(), Some(replacement));
    }

    #[test]
    fn test_update_drops_stale_fields_in_category() {
        let (_tmp, _paths, vault) = setup();
        vault
            .update("api", Category::from([("old".to_string(), "1".to_string())]))
            .unwrap();
        vault
            .update("api", Category::from([("new".to_string(), "2".to_string())]))
            .unwrap();

        let bundle = vault.load().unwrap().unwrap();
        let api = bundle.get("api").unwrap();
        assert!(api.get("old").is_none());
        assert_eq!(api.get("new").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_wrong_key_fails_without_partial_result() {
        let (_tmp, paths, vault) = setup();
        vault.store_aws_credentials(&aws()).unwrap();

        let other = Vault::with_key(&paths, "dev", Key::generate());
        let err = other.load().unwrap_err();
        assert!(matches!(err, Error::Crypto(CryptoError::Decrypt(_))));
    }

    #[test]
    fn test_tampered_file_fails() {
        let (_tmp, _paths, vault) = setup();
        vault.store_database_credentials(&db("pw")).unwrap();

        let mut bytes = std::fs::read(vault.file()).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0x01;
        std::fs::write(vault.file(), bytes).unwrap();

        assert!(vault.load().is_err());
    }

    #[test]
    fn test_environments_are_separate_files() {
        let (_tmp, paths, _vault) = setup();
        let key = Key::generate();
        let dev = Vault::with_key(&paths, "dev", key.clone());
        let prod = Vault::with_key(&paths, "prod", key);

        dev.store_aws_credentials(&aws()).unwrap();
        assert!(prod.load().unwrap().is_none());
        assert_ne!(dev.file(), prod.file());
    }

    #[test]
    fn test_open_with_persisted_key() {
        let tmp = TempDir::new().unwrap();
        let paths = Paths::new(tmp.path());

        let first = Vault::open(&paths, "dev", &KeySource::passphrase("pw")).unwrap();
        first.store_aws_credentials(&aws()).unwrap();

        let second = Vault::open(&paths, "dev", &KeySource::Persisted).unwrap();
        assert_eq!(second.aws_credentials().unwrap(), Some(aws()));
    }

    #[test]
    fn test_mirror_uploads_full_bundle() {
        let (_tmp, _paths, vault) = setup();
        vault.store_aws_credentials(&aws()).unwrap();
        vault.store_database_credentials(&db("pw")).unwrap();

        let store = MemoryStore::default();
        let (name, outcome) = vault.mirror(&store, "acme").unwrap();
        assert_eq!(name, "acme-dev-database-credentials");
        assert_eq!(outcome, Upsert::Created);

        let secrets = store.secrets.borrow();
        let uploaded = Bundle::from_json(secrets[&name].as_bytes()).unwrap();
        assert_eq!(Some(uploaded), vault.load().unwrap());
    }

    #[test]
    fn test_mirror_twice_updates() {
        let (_tmp, _paths, vault) = setup();
        vault.store_database_credentials(&db("pw")).unwrap();

        let store = MemoryStore::default();
        vault.mirror(&store, "acme").unwrap();
        let (_, outcome) = vault.mirror(&store, "acme").unwrap();
        assert_eq!(outcome, Upsert::Updated);
    }

    #[test]
    fn test_mirror_without_credentials() {
        let (_tmp, _paths, vault) = setup();
        let err = vault.mirror(&MemoryStore::default(), "acme").unwrap_err();
        assert!(matches!(err, Error::Vault(VaultError::Empty(_))));
    }

    #[test]
    fn test_mirror_failure_keeps_local_copy() {
        let (_tmp, _paths, vault) = setup();
        vault.store_database_credentials(&db("pw")).unwrap();
        let before = std::fs::read(vault.file()).unwrap();

        let store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let err = vault.mirror(&store, "acme").unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(std::fs::read(vault.file()).unwrap(), before);
    }
}
