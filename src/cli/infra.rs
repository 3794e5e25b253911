//! Infra commands.
//!
//! Resolve the environment's profile, region and organization from flags
//! or stored settings, then hand off to CDK.

use std::io::{self, IsTerminal};

use dialoguer::Confirm;
use tracing::{debug, warn};

use crate::cli::resolve::Context;
use crate::cli::{output, Environment, InfraArgs};
use crate::core::cloud::{Aws, CloudConfig};
use crate::core::constants;
use crate::core::infra::{Cdk, CdkCommand, CdkEnv};
use crate::core::settings::EnvironmentSettings;
use crate::error::{Error, Result};

struct Target {
    settings: EnvironmentSettings,
    cloud: CloudConfig,
}

impl Target {
    fn resolve(ctx: &Context, args: &InfraArgs) -> Result<Self> {
        let mut settings = ctx.environment(args.env)?;
        if let Some(org) = &args.org_name {
            settings.org_name = org.clone();
        }
        let cloud = ctx.cloud_config(
            args.env,
            &settings,
            args.aws_profile.as_deref(),
            args.aws_region.as_deref(),
        )?;
        debug!(env = %args.env, profile = ?cloud.profile, region = %cloud.region, "resolved target");
        Ok(Self { settings, cloud })
    }

    fn cdk_env(&self, env: Environment) -> CdkEnv {
        CdkEnv {
            profile: self.cloud.profile.clone(),
            region: self.cloud.region.clone(),
            environment: env.to_string(),
            org_name: self.settings.org_name.clone(),
            credentials: self.cloud.credentials.clone(),
        }
    }
}

fn cdk(args: &InfraArgs) -> Result<Cdk> {
    let cdk = Cdk::locate()?;
    Ok(match &args.app_dir {
        Some(dir) => cdk.in_dir(dir),
        None => cdk,
    })
}

fn run(args: &InfraArgs, target: &Target, command: CdkCommand) -> Result<()> {
    let verb = command.verb();
    cdk(args)?.run(&command, &target.cdk_env(args.env))?;
    output::success(&format!("cdk {} finished for {}", verb, args.env));
    Ok(())
}

/// Bootstrap the CDK toolkit into the environment's account and region.
pub fn bootstrap(ctx: &Context, args: &InfraArgs) -> Result<()> {
    let target = Target::resolve(ctx, args)?;

    let account = match &target.settings.account_id {
        Some(account) if args.aws_profile.is_none() => account.clone(),
        _ => Aws::connect(&target.cloud)?.account_id()?,
    };

    let command = CdkCommand::Bootstrap {
        account,
        region: target.cloud.region.clone(),
    };
    run(args, &target, command)
}

pub fn deploy(ctx: &Context, args: &InfraArgs) -> Result<()> {
    let target = Target::resolve(ctx, args)?;
    run(args, &target, CdkCommand::Deploy)
}

/// Destroy every stack after confirmation.
pub fn destroy(ctx: &Context, args: &InfraArgs, force: bool) -> Result<()> {
    let target = Target::resolve(ctx, args)?;

    if !force {
        if !io::stdin().is_terminal() {
            return Err(Error::Command(
                "refusing to destroy without confirmation; pass --force".to_string(),
            ));
        }
        output::warn(&format!(
            "this destroys every stack in {} ({})",
            args.env, target.settings.org_name
        ));
        let confirmed = Confirm::new()
            .with_prompt("Destroy?")
            .default(false)
            .interact()?;
        if !confirmed {
            output::dimmed("cancelled");
            return Ok(());
        }
    }

    run(args, &target, CdkCommand::Destroy)
}

/// Show stored settings, the image repository and pending changes.
pub fn status(ctx: &Context, args: &InfraArgs) -> Result<()> {
    let target = Target::resolve(ctx, args)?;
    let settings = &target.settings;

    output::section(&format!("{} ({})", args.env, settings.org_name));
    output::kv("region:      ", &target.cloud.region);
    match &target.cloud.profile {
        Some(profile) => output::kv("profile:     ", profile),
        None => output::kv("credentials: ", "vault"),
    }
    let unset = || "-".to_string();
    output::kv("account:     ", settings.account_id.clone().unwrap_or_else(unset));
    output::kv("state bucket:", settings.state_bucket.clone().unwrap_or_else(unset));
    output::kv("lock table:  ", settings.lock_table.clone().unwrap_or_else(unset));

    let repository = constants::repository_name(&settings.org_name, args.env.as_str());
    match Aws::connect(&target.cloud).and_then(|aws| aws.repository_uri(&repository)) {
        Ok(Some(uri)) => output::kv("repository:  ", uri),
        Ok(None) => output::kv("repository:  ", "not created"),
        Err(e) => {
            warn!(error = %e, "repository lookup failed");
            output::warn(&format!("repository lookup failed: {}", e));
        }
    }
    println!();

    run(args, &target, CdkCommand::Diff)
}
