//! Constants used throughout bootkit.
//!
//! Centralizes file names, naming patterns and crypto parameters.

/// Per-user state directory relative to HOME (~/.bootkit).
pub const HOME_DIR: &str = ".bootkit";

/// Settings file name inside the state directory.
pub const SETTINGS_FILE: &str = "config.toml";

/// Key file name inside the state directory.
pub const KEY_FILE: &str = ".key";

/// Suffix of the per-environment encrypted credential file.
pub const CREDENTIALS_SUFFIX: &str = "_credentials.enc";

/// PBKDF2-HMAC-SHA256 iteration count.
pub const KDF_ITERATIONS: u32 = 100_000;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Owner read/write only.
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Bundle category holding AWS access keys.
pub const AWS_CATEGORY: &str = "aws";

/// Bundle category holding database connection parameters.
pub const DATABASE_CATEGORY: &str = "database";

/// Region that rejects an explicit S3 location constraint.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Profile used when none is configured.
pub const DEFAULT_PROFILE: &str = "default";

/// Hash key of the state lock table.
pub const LOCK_TABLE_KEY: &str = "LockID";

/// Name of the managed secret mirroring an environment's credentials.
pub fn mirror_secret_name(org: &str, env: &str) -> String {
    format!("{}-{}-database-credentials", org, env)
}

/// Name of the infrastructure state bucket.
pub fn state_bucket_name(org: &str, env: &str, account: &str) -> String {
    format!("{}-{}-terraform-state-{}", org, env, account)
}

/// Name of the state lock table.
pub fn lock_table_name(org: &str, env: &str) -> String {
    format!("{}-{}-terraform-locks", org, env)
}

/// Name of the CDK asset bucket.
pub fn cdk_bucket_name(org: &str, env: &str, account: &str) -> String {
    format!("cdk-bootstrap-{}-{}-{}", org, env, account)
}

/// Name of the application image repository.
pub fn repository_name(org: &str, env: &str) -> String {
    format!("{}-{}-api", org, env)
}
