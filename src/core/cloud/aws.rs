//! AWS implementation of the cloud helpers.
//!
//! The SDK is async; every helper here is synchronous and blocks on a
//! current-thread runtime owned by [`Aws`]. Timeouts and retries are the
//! SDK defaults.

use std::time::Duration;

use aws_sdk_sts::config::{Credentials, Region};
use aws_sdk_sts::error::DisplayErrorContext;
use tracing::{debug, info, trace};

use super::{CloudConfig, Ensure};
use crate::core::constants::LOCK_TABLE_KEY;
use crate::core::vault::{SecretStore, Upsert};
use crate::error::{RemoteError, Result};

const TABLE_POLL_INTERVAL: Duration = Duration::from_secs(2);
const TABLE_POLL_ATTEMPTS: u32 = 60;

fn remote<E: std::error::Error>(operation: &'static str, err: E) -> RemoteError {
    RemoteError::service(operation, DisplayErrorContext(err).to_string())
}

/// A connected AWS session.
pub struct Aws {
    runtime: tokio::runtime::Runtime,
    sdk: aws_config::SdkConfig,
    region: String,
    location_constraint: bool,
}

impl Aws {
    /// Resolve the SDK configuration for `config`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the runtime cannot be built.
    pub fn connect(config: &CloudConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RemoteError::Unavailable(format!("failed to create runtime: {}", e)))?;

        debug!(
            profile = config.profile.as_deref().unwrap_or("-"),
            region = %config.region,
            static_credentials = config.credentials.is_some(),
            "loading AWS config"
        );

        let sdk = runtime.block_on(async {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(Region::new(config.region.clone()));

            if let Some(creds) = &config.credentials {
                loader = loader.credentials_provider(Credentials::new(
                    creds.access_key_id.clone(),
                    creds.secret_access_key.clone(),
                    creds.session_token.clone(),
                    None,
                    "bootkit-vault",
                ));
            } else if let Some(profile) = &config.profile {
                loader = loader.profile_name(profile);
            }

            loader.load().await
        });

        Ok(Self {
            runtime,
            sdk,
            region: config.region.clone(),
            location_constraint: config.needs_location_constraint(),
        })
    }

    /// Account of the current identity.
    pub fn account_id(&self) -> Result<String> {
        let client = aws_sdk_sts::Client::new(&self.sdk);
        let output = self
            .runtime
            .block_on(client.get_caller_identity().send())
            .map_err(|e| remote("GetCallerIdentity", e))?;

        let account = output
            .account()
            .ok_or_else(|| RemoteError::service("GetCallerIdentity", "no account in response"))?;
        debug!(account, "resolved caller identity");
        Ok(account.to_string())
    }

    /// Create a versioned, AES256-encrypted bucket unless this account
    /// already owns it.
    pub fn ensure_bucket(&self, name: &str) -> Result<Ensure> {
        use aws_sdk_s3::types::{
            BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration,
            ServerSideEncryption, ServerSideEncryptionByDefault,
            ServerSideEncryptionConfiguration, ServerSideEncryptionRule, VersioningConfiguration,
        };

        let client = aws_sdk_s3::Client::new(&self.sdk);

        let mut request = client.create_bucket().bucket(name);
        if self.location_constraint {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match self.runtime.block_on(request.send()) {
            Ok(_) => {}
            Err(e)
                if e.as_service_error()
                    .is_some_and(|s| s.is_bucket_already_owned_by_you()) =>
            {
                debug!(bucket = name, "bucket already owned");
                return Ok(Ensure::AlreadyExists);
            }
            Err(e) => return Err(remote("CreateBucket", e).into()),
        }

        trace!(bucket = name, "enabling versioning");
        self.runtime
            .block_on(
                client
                    .put_bucket_versioning()
                    .bucket(name)
                    .versioning_configuration(
                        VersioningConfiguration::builder()
                            .status(BucketVersioningStatus::Enabled)
                            .build(),
                    )
                    .send(),
            )
            .map_err(|e| remote("PutBucketVersioning", e))?;

        trace!(bucket = name, "enabling default encryption");
        let by_default = ServerSideEncryptionByDefault::builder()
            .sse_algorithm(ServerSideEncryption::Aes256)
            .build()
            .map_err(|e| remote("PutBucketEncryption", e))?;
        let encryption = ServerSideEncryptionConfiguration::builder()
            .rules(
                ServerSideEncryptionRule::builder()
                    .apply_server_side_encryption_by_default(by_default)
                    .build(),
            )
            .build()
            .map_err(|e| remote("PutBucketEncryption", e))?;
        self.runtime
            .block_on(
                client
                    .put_bucket_encryption()
                    .bucket(name)
                    .server_side_encryption_configuration(encryption)
                    .send(),
            )
            .map_err(|e| remote("PutBucketEncryption", e))?;

        info!(bucket = name, "bucket created");
        Ok(Ensure::Created)
    }

    /// Create the pay-per-request lock table unless it exists, then wait
    /// until it is active.
    pub fn ensure_lock_table(&self, name: &str) -> Result<Ensure> {
        use aws_sdk_dynamodb::types::{
            AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
        };

        let client = aws_sdk_dynamodb::Client::new(&self.sdk);

        let key = KeySchemaElement::builder()
            .attribute_name(LOCK_TABLE_KEY)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| remote("CreateTable", e))?;
        let attribute = AttributeDefinition::builder()
            .attribute_name(LOCK_TABLE_KEY)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| remote("CreateTable", e))?;

        let request = client
            .create_table()
            .table_name(name)
            .key_schema(key)
            .attribute_definitions(attribute)
            .billing_mode(BillingMode::PayPerRequest);

        match self.runtime.block_on(request.send()) {
            Ok(_) => {}
            Err(e)
                if e.as_service_error()
                    .is_some_and(|s| s.is_resource_in_use_exception()) =>
            {
                debug!(table = name, "table already exists");
                return Ok(Ensure::AlreadyExists);
            }
            Err(e) => return Err(remote("CreateTable", e).into()),
        }

        self.wait_for_table(&client, name)?;
        info!(table = name, "lock table created");
        Ok(Ensure::Created)
    }

    fn wait_for_table(&self, client: &aws_sdk_dynamodb::Client, name: &str) -> Result<()> {
        use aws_sdk_dynamodb::types::TableStatus;

        for attempt in 1..=TABLE_POLL_ATTEMPTS {
            let output = self
                .runtime
                .block_on(client.describe_table().table_name(name).send())
                .map_err(|e| remote("DescribeTable", e))?;

            let status = output.table().and_then(|t| t.table_status());
            trace!(table = name, attempt, ?status, "waiting for table");
            if status == Some(&TableStatus::Active) {
                return Ok(());
            }

            self.runtime.block_on(tokio::time::sleep(TABLE_POLL_INTERVAL));
        }

        Err(RemoteError::service(
            "DescribeTable",
            format!("table {} did not become active", name),
        )
        .into())
    }

    /// URI of an image repository, or `None` if it does not exist.
    pub fn repository_uri(&self, name: &str) -> Result<Option<String>> {
        let client = aws_sdk_ecr::Client::new(&self.sdk);

        match self
            .runtime
            .block_on(client.describe_repositories().repository_names(name).send())
        {
            Ok(output) => Ok(output
                .repositories()
                .first()
                .and_then(|r| r.repository_uri())
                .map(str::to_string)),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|s| s.is_repository_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(remote("DescribeRepositories", e).into()),
        }
    }
}

impl SecretStore for Aws {
    fn upsert_secret(&self, name: &str, value: &str) -> Result<Upsert> {
        let client = aws_sdk_secretsmanager::Client::new(&self.sdk);

        match self
            .runtime
            .block_on(client.describe_secret().secret_id(name).send())
        {
            Ok(_) => {
                self.runtime
                    .block_on(
                        client
                            .update_secret()
                            .secret_id(name)
                            .secret_string(value)
                            .send(),
                    )
                    .map_err(|e| remote("UpdateSecret", e))?;
                Ok(Upsert::Updated)
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|s| s.is_resource_not_found_exception()) =>
            {
                self.runtime
                    .block_on(
                        client
                            .create_secret()
                            .name(name)
                            .secret_string(value)
                            .send(),
                    )
                    .map_err(|e| remote("CreateSecret", e))?;
                Ok(Upsert::Created)
            }
            Err(e) => Err(remote("DescribeSecret", e).into()),
        }
    }
}
