//! Settings file management.
//!
//! Reads and writes `~/.bootkit/config.toml`. The raw table is addressed by
//! dotted paths (`environments.dev.aws_region`); the `environments.<name>`
//! entries also have a typed view for the commands that create them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toml::{Table, Value};
use tracing::debug;

use crate::error::{ConfigError, Result};

const ENVIRONMENTS: &str = "environments";

/// Settings loaded from disk.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
    table: Table,
}

/// Everything `init project` records about one environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    pub org_name: String,
    /// Absent when the environment authenticates with stored access keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,
    pub aws_region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdk_bootstrap_bucket: Option<String>,
    #[serde(default)]
    pub use_credentials: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialized_at: Option<String>,
}

impl Settings {
    /// Load settings from `path`.
    ///
    /// A missing file yields empty settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` if the file exists but cannot be read,
    /// or `ConfigError::Parse` if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading settings");

        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                table: Table::new(),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let table: Table = toml::from_str(&contents).map_err(ConfigError::Parse)?;

        debug!(keys = table.len(), "settings loaded");
        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    /// Write settings back to their file, creating the parent directory.
    pub fn save(&self) -> Result<()> {
        debug!(path = %self.path.display(), "saving settings");

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(&self.table).map_err(ConfigError::Serialize)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole settings table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Look up a value by dotted path.
    ///
    /// Returns `None` if any segment is missing or walks through a
    /// non-table value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let parts = split_path(key).ok()?;
        let (last, parents) = parts.split_last()?;

        let mut table = &self.table;
        for part in parents {
            table = table.get(*part)?.as_table()?;
        }
        table.get(*last)
    }

    /// Set a value by dotted path.
    ///
    /// Missing intermediate tables are created; intermediate values that
    /// are not tables are replaced by tables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPath` for an empty path or segment.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let parts = split_path(key)?;
        let Some((last, parents)) = parts.split_last() else {
            return Err(ConfigError::InvalidPath(key.to_string()).into());
        };

        let mut table = &mut self.table;
        for part in parents {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            table = entry
                .as_table_mut()
                .ok_or_else(|| ConfigError::InvalidPath(key.to_string()))?;
        }

        table.insert(last.to_string(), value);
        Ok(())
    }

    /// Delete a value by dotted path.
    ///
    /// Returns `true` if something was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let Ok(parts) = split_path(key) else {
            return false;
        };
        let Some((last, parents)) = parts.split_last() else {
            return false;
        };

        let mut table = &mut self.table;
        for part in parents {
            match table.get_mut(*part) {
                Some(Value::Table(t)) => table = t,
                _ => return false,
            }
        }
        table.remove(*last).is_some()
    }

    /// Typed settings of one environment, if initialized.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the entry exists but lacks required
    /// fields.
    pub fn environment(&self, name: &str) -> Result<Option<EnvironmentSettings>> {
        let Some(Value::Table(entry)) = self.table.get(ENVIRONMENTS).and_then(|v| {
            v.as_table().and_then(|envs| envs.get(name))
        }) else {
            return Ok(None);
        };

        if entry.is_empty() {
            return Ok(None);
        }

        let settings = Value::Table(entry.clone())
            .try_into()
            .map_err(ConfigError::Parse)?;
        Ok(Some(settings))
    }

    /// Like [`Settings::environment`], but an absent entry is an error.
    pub fn require_environment(&self, name: &str) -> Result<EnvironmentSettings> {
        self.environment(name)?
            .ok_or_else(|| ConfigError::EnvironmentNotInitialized(name.to_string()).into())
    }

    /// Merge typed settings into `environments.<name>`.
    ///
    /// Keys already present but not part of `EnvironmentSettings` survive.
    /// Optional fields that are `None` are removed.
    pub fn upsert_environment(&mut self, name: &str, env: &EnvironmentSettings) -> Result<()> {
        let Value::Table(fields) = Value::try_from(env).map_err(ConfigError::Serialize)? else {
            return Err(ConfigError::InvalidPath(name.to_string()).into());
        };

        let base = format!("{}.{}", ENVIRONMENTS, name);
        for (key, value) in fields {
            self.set(&format!("{}.{}", base, key), value)?;
        }

        let cleared = [
            ("aws_profile", env.aws_profile.is_none()),
            ("account_id", env.account_id.is_none()),
            ("state_bucket", env.state_bucket.is_none()),
            ("lock_table", env.lock_table.is_none()),
            ("cdk_bootstrap_bucket", env.cdk_bootstrap_bucket.is_none()),
        ];
        for (key, is_none) in cleared {
            if is_none {
                self.delete(&format!("{}.{}", base, key));
            }
        }

        Ok(())
    }
}

fn split_path(key: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidPath(key.to_string()).into());
    }
    Ok(parts)
}

/// Interpret a command-line value: booleans and integers keep their type,
/// everything else is a string.
pub fn parse_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => raw
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

/// Render a value for display. Strings print bare.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Table(t) => toml::to_string_pretty(t).unwrap_or_default(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn empty() -> (TempDir, Settings) {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(&tmp.path().join("config.toml")).unwrap();
        (tmp, settings)
    }

    fn sample_env() -> EnvironmentSettings {
        EnvironmentSettings {
            org_name: "acme".into(),
            aws_profile: Some("default".into()),
            aws_region: "eu-west-1".into(),
            account_id: Some("123456789012".into()),
            state_bucket: Some("acme-dev-terraform-state-123456789012".into()),
            lock_table: Some("acme-dev-terraform-locks".into()),
            cdk_bootstrap_bucket: Some("cdk-bootstrap-acme-dev-123456789012".into()),
            use_credentials: false,
            initialized_at: None,
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_tmp, settings) = empty();
        assert!(settings.table().is_empty());
        assert!(settings.get("environments").is_none());
    }

    #[test]
    fn test_set_get_nested() {
        let (_tmp, mut settings) = empty();
        settings
            .set("environments.dev.aws_region", Value::String("us-west-2".into()))
            .unwrap();

        assert_eq!(
            settings.get("environments.dev.aws_region"),
            Some(&Value::String("us-west-2".into()))
        );
        assert!(settings.get("environments.dev").unwrap().is_table());
        assert!(settings.get("environments.prod.aws_region").is_none());
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let (_tmp, mut settings) = empty();
        settings.set("a", Value::Integer(1)).unwrap();
        settings.set("a.b", Value::Integer(2)).unwrap();
        assert_eq!(settings.get("a.b"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_get_through_scalar_is_none() {
        let (_tmp, mut settings) = empty();
        settings.set("a", Value::Integer(1)).unwrap();
        assert!(settings.get("a.b").is_none());
    }

    #[test]
    fn test_invalid_paths() {
        let (_tmp, mut settings) = empty();
        assert!(settings.set("", Value::Integer(1)).is_err());
        assert!(settings.set("a..b", Value::Integer(1)).is_err());
        assert!(settings.get("").is_none());
        assert!(!settings.delete("a."));
    }

    #[test]
    fn test_delete() {
        let (_tmp, mut settings) = empty();
        settings.set("x.y.z", Value::Boolean(true)).unwrap();

        assert!(settings.delete("x.y.z"));
        assert!(settings.get("x.y.z").is_none());
        assert!(settings.get("x.y").is_some());
        assert!(!settings.delete("x.y.z"));
        assert!(!settings.delete("missing.key"));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut settings = Settings::load(&path).unwrap();
        settings.set("project.name", Value::String("demo".into())).unwrap();
        settings.set("project.replicas", Value::Integer(3)).unwrap();
        settings.save().unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(
            loaded.get("project.name"),
            Some(&Value::String("demo".into()))
        );
        assert_eq!(loaded.get("project.replicas"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Config(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_environment_roundtrip() {
        let (_tmp, mut settings) = empty();
        let env = sample_env();

        settings.upsert_environment("dev", &env).unwrap();
        assert_eq!(settings.environment("dev").unwrap(), Some(env));
        assert!(settings.environment("prod").unwrap().is_none());
    }

    #[test]
    fn test_upsert_keeps_unrelated_keys_and_clears_profile() {
        let (_tmp, mut settings) = empty();
        settings
            .set("environments.dev.notes", Value::String("keep me".into()))
            .unwrap();
        settings.upsert_environment("dev", &sample_env()).unwrap();

        let mut switched = sample_env();
        switched.aws_profile = None;
        switched.use_credentials = true;
        settings.upsert_environment("dev", &switched).unwrap();

        assert!(settings.get("environments.dev.aws_profile").is_none());
        assert_eq!(
            settings.get("environments.dev.notes"),
            Some(&Value::String("keep me".into()))
        );
        assert!(settings.environment("dev").unwrap().unwrap().use_credentials);
    }

    #[test]
    fn test_require_environment() {
        let (_tmp, settings) = empty();
        let err = settings.require_environment("test").unwrap_err();
        assert!(err.to_string().contains("'test' is not initialized"));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true"), Value::Boolean(true));
        assert_eq!(parse_value("5432"), Value::Integer(5432));
        assert_eq!(parse_value("us-east-1"), Value::String("us-east-1".into()));
    }
}
