//! Init commands.
//!
//! `init project` creates the per-environment state backends and records
//! them in the settings file. `init database` stores connection details in
//! the vault and can mirror them to Secrets Manager.

use std::io::{self, IsTerminal};

use dialoguer::{Confirm, Input, Password};
use tracing::info;

use crate::cli::resolve::Context;
use crate::cli::{creds, output, Environment};
use crate::core::cloud::{Aws, CloudConfig, Ensure};
use crate::core::constants;
use crate::core::settings::EnvironmentSettings;
use crate::core::vault::{AwsCredentials, DatabaseCredentials};
use crate::error::{Error, Result};

pub struct ProjectOptions {
    pub org_name: String,
    pub aws_profile: String,
    pub aws_region: String,
    pub environment: Environment,
    pub use_credentials: bool,
}

pub struct DatabaseOptions {
    pub env: Environment,
    pub username: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    /// `None` asks when attached to a terminal.
    pub mirror: Option<bool>,
}

fn require_terminal(what: &str) -> Result<()> {
    if io::stdin().is_terminal() {
        Ok(())
    } else {
        Err(Error::Command(format!(
            "{} requires an interactive terminal",
            what
        )))
    }
}

fn prompt_aws_credentials() -> Result<AwsCredentials> {
    require_terminal("--use-credentials")?;

    let access_key_id: String = Input::new()
        .with_prompt("AWS Access Key ID")
        .interact_text()?;
    let secret_access_key = Password::new()
        .with_prompt("AWS Secret Access Key")
        .interact()?;
    let session_token: String = Input::new()
        .with_prompt("AWS Session Token (optional)")
        .allow_empty(true)
        .interact_text()?;

    Ok(AwsCredentials {
        access_key_id: access_key_id.trim().to_string(),
        secret_access_key,
        session_token: Some(session_token.trim().to_string()).filter(|t| !t.is_empty()),
    })
}

/// Run one idempotent create as a progress line.
fn ensure_step(label: &str, f: impl FnOnce() -> Result<Ensure>) -> Result<()> {
    output::progress(label);
    match f() {
        Ok(outcome) => {
            output::progress_done(outcome.describe(), true);
            Ok(())
        }
        Err(e) => {
            output::progress_done("failed", false);
            Err(e)
        }
    }
}

/// Initialize a project environment.
pub fn project(ctx: &Context, opts: &ProjectOptions) -> Result<()> {
    let env = opts.environment;
    info!(org = %opts.org_name, %env, "initializing project");

    output::header(&format!("Initializing {} ({})", opts.org_name, env));
    if !opts.use_credentials {
        output::kv("profile:", &opts.aws_profile);
    }
    output::kv("region: ", &opts.aws_region);

    let config = if opts.use_credentials {
        let credentials = prompt_aws_credentials()?;
        ctx.vault_for_write(env)?
            .store_aws_credentials(&credentials)?;
        output::success("AWS credentials stored in the vault");
        CloudConfig::with_credentials(credentials, &opts.aws_region)
    } else {
        CloudConfig::with_profile(&opts.aws_profile, &opts.aws_region)
    };

    let aws = Aws::connect(&config)?;
    let account = aws.account_id()?;
    output::kv("account:", &account);
    println!();

    let state_bucket = constants::state_bucket_name(&opts.org_name, env.as_str(), &account);
    let lock_table = constants::lock_table_name(&opts.org_name, env.as_str());
    let cdk_bucket = constants::cdk_bucket_name(&opts.org_name, env.as_str(), &account);

    ensure_step(&format!("State bucket {}", output::name(&state_bucket)), || {
        aws.ensure_bucket(&state_bucket)
    })?;
    ensure_step(&format!("Lock table {}", output::name(&lock_table)), || {
        aws.ensure_lock_table(&lock_table)
    })?;
    ensure_step(&format!("CDK asset bucket {}", output::name(&cdk_bucket)), || {
        aws.ensure_bucket(&cdk_bucket)
    })?;

    let mut settings = ctx.settings()?;
    settings.upsert_environment(
        env.as_str(),
        &EnvironmentSettings {
            org_name: opts.org_name.clone(),
            aws_profile: (!opts.use_credentials).then(|| opts.aws_profile.clone()),
            aws_region: opts.aws_region.clone(),
            account_id: Some(account),
            state_bucket: Some(state_bucket),
            lock_table: Some(lock_table),
            cdk_bootstrap_bucket: Some(cdk_bucket),
            use_credentials: opts.use_credentials,
            initialized_at: Some(chrono::Utc::now().to_rfc3339()),
        },
    )?;
    settings.save()?;

    println!();
    output::success(&format!("environment {} initialized", env));
    output::hint(&format!("next: bootkit infra bootstrap --env {}", env));
    output::hint(&format!("then: bootkit infra deploy --env {}", env));
    Ok(())
}

/// Store database credentials for an environment.
pub fn database(ctx: &Context, opts: &DatabaseOptions) -> Result<()> {
    info!(env = %opts.env, "storing database credentials");

    let password = match &opts.password {
        Some(p) => p.clone(),
        None => {
            require_terminal("prompting for --password")?;
            Password::new().with_prompt("Database password").interact()?
        }
    };

    let credentials = DatabaseCredentials {
        username: opts.username.clone(),
        password,
        host: opts.host.clone(),
        port: opts.port,
        database_name: opts.database.clone(),
    };

    let vault = ctx.vault_for_write(opts.env)?;
    vault.store_database_credentials(&credentials)?;
    output::success(&format!("database credentials stored for {}", opts.env));

    let mirror = match opts.mirror {
        Some(choice) => choice,
        None if io::stdin().is_terminal() => Confirm::new()
            .with_prompt("Store these credentials in AWS Secrets Manager?")
            .default(false)
            .interact()?,
        None => false,
    };

    if mirror {
        creds::mirror_vault(ctx, opts.env, &vault)?;
    }

    Ok(())
}
