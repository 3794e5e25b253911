//! Config commands.
//!
//! Dotted-key access to `config.toml`. Values given on the command line
//! keep `true`/`false` and integers typed; everything else is a string.

use tracing::debug;

use crate::cli::output;
use crate::cli::resolve::Context;
use crate::core::settings::{display_value, parse_value};
use crate::error::{ConfigError, Result};

pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let settings = ctx.settings()?;
    let value = settings
        .get(key)
        .ok_or_else(|| ConfigError::NotSet(key.to_string()))?;
    println!("{}", display_value(value).trim_end());
    Ok(())
}

pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut settings = ctx.settings()?;
    let parsed = parse_value(value);
    debug!(key, value_type = parsed.type_str(), "setting value");

    settings.set(key, parsed)?;
    settings.save()?;
    output::success(&format!("set {}", output::name(key)));
    Ok(())
}

pub fn unset(ctx: &Context, key: &str) -> Result<()> {
    let mut settings = ctx.settings()?;
    if !settings.delete(key) {
        return Err(ConfigError::NotSet(key.to_string()).into());
    }
    settings.save()?;
    output::success(&format!("removed {}", output::name(key)));
    Ok(())
}

pub fn show(ctx: &Context) -> Result<()> {
    let settings = ctx.settings()?;
    if settings.table().is_empty() {
        output::dimmed(&format!(
            "no settings at {}",
            settings.path().display()
        ));
        return Ok(());
    }

    let rendered = toml::to_string_pretty(settings.table()).map_err(ConfigError::Serialize)?;
    print!("{}", rendered);
    Ok(())
}
