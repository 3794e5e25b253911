//! Creds commands.

use tracing::info;

use crate::cli::resolve::Context;
use crate::cli::{output, Environment};
use crate::core::cloud::Aws;
use crate::core::vault::{mask, Upsert, Vault};
use crate::error::Result;

/// List stored credentials with every value masked.
pub fn show(ctx: &Context, env: Environment) -> Result<()> {
    let vault = ctx.vault_for_read(env)?;

    let bundle = match vault.load()? {
        Some(b) if !b.is_empty() => b,
        _ => {
            output::dimmed(&format!("no credentials stored for {}", env));
            return Ok(());
        }
    };

    for (category, fields) in bundle.iter() {
        output::section(category);
        for (field, value) in fields {
            output::kv(field, mask(field, value));
        }
    }

    Ok(())
}

/// Upload the credential bundle to Secrets Manager.
pub fn mirror(ctx: &Context, env: Environment) -> Result<()> {
    let vault = ctx.vault_for_read(env)?;
    mirror_vault(ctx, env, &vault)
}

/// Mirror `vault` using the environment's cloud settings.
pub(crate) fn mirror_vault(ctx: &Context, env: Environment, vault: &Vault) -> Result<()> {
    let settings = ctx.environment(env)?;
    let config = ctx.cloud_config(env, &settings, None, None)?;
    let aws = Aws::connect(&config)?;

    info!(%env, org = %settings.org_name, "mirroring credentials");
    let (name, outcome) = vault.mirror(&aws, &settings.org_name)?;

    let verb = match outcome {
        Upsert::Created => "created",
        Upsert::Updated => "updated",
    };
    output::success(&format!("secret {} {}", output::name(&name), verb));
    Ok(())
}
