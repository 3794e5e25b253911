//! Cloud resource helpers.
//!
//! All provider settings travel in a [`CloudConfig`] built by the caller.
//! Nothing here reads or writes process environment variables.
//!
//! The AWS implementation is feature-gated (`aws`, on by default).

use crate::core::constants;
use crate::core::settings::EnvironmentSettings;
use crate::core::vault::AwsCredentials;

#[cfg(feature = "aws")]
mod aws;

#[cfg(feature = "aws")]
pub use aws::Aws;

/// Explicit provider settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudConfig {
    /// Named profile from the shared config files. Ignored when
    /// `credentials` is set.
    pub profile: Option<String>,
    pub region: String,
    /// Static access keys, typically loaded from the vault.
    pub credentials: Option<AwsCredentials>,
}

impl CloudConfig {
    pub fn with_profile(profile: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            profile: Some(profile.into()),
            region: region.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(credentials: AwsCredentials, region: impl Into<String>) -> Self {
        Self {
            profile: None,
            region: region.into(),
            credentials: Some(credentials),
        }
    }

    /// Settings for an initialized environment.
    ///
    /// Flag overrides win over stored values; a missing profile falls back
    /// to `default` unless the environment uses stored credentials.
    pub fn for_environment(
        env: &EnvironmentSettings,
        profile_override: Option<&str>,
        region_override: Option<&str>,
        credentials: Option<AwsCredentials>,
    ) -> Self {
        let region = region_override
            .map(str::to_string)
            .unwrap_or_else(|| env.aws_region.clone());

        match credentials {
            Some(creds) if env.use_credentials && profile_override.is_none() => {
                Self::with_credentials(creds, region)
            }
            _ => Self::with_profile(
                profile_override
                    .map(str::to_string)
                    .or_else(|| env.aws_profile.clone())
                    .unwrap_or_else(|| constants::DEFAULT_PROFILE.to_string()),
                region,
            ),
        }
    }

    /// S3 rejects an explicit location constraint in us-east-1.
    pub fn needs_location_constraint(&self) -> bool {
        self.region != constants::DEFAULT_REGION
    }
}

/// Outcome of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensure {
    Created,
    AlreadyExists,
}

impl Ensure {
    pub fn describe(&self) -> &'static str {
        match self {
            Ensure::Created => "created",
            Ensure::AlreadyExists => "already exists",
        }
    }
}
