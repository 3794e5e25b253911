//! Bootkit - bootstrap kit for an AWS-hosted web service.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bootkit::cli::output;
use bootkit::cli::{execute, Cli};
use bootkit::error::{ConfigError, CryptoError, Error, VaultError};

fn hint_for(e: &Error) -> Option<&'static str> {
    match e {
        Error::Config(ConfigError::EnvironmentNotInitialized(_)) => {
            Some("run: bootkit init project --org-name <name>")
        }
        Error::Crypto(CryptoError::MissingKey(_)) => {
            Some("pass --passphrase or set BOOTKIT_PASSPHRASE to create the vault key")
        }
        Error::Vault(VaultError::NotCreated(_)) => Some("run: bootkit init database"),
        Error::Crypto(CryptoError::Decrypt(_)) => {
            Some("the key file does not match this credential file")
        }
        Error::Vault(VaultError::Empty(_)) => Some("run: bootkit init database"),
        e if e.is_retryable() => Some("this may be temporary; try again"),
        _ => None,
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("BOOTKIT_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("bootkit=debug")
        } else {
            EnvFilter::new("bootkit=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    if let Err(e) = execute(cli) {
        output::error(&e.to_string());
        if let Some(hint) = hint_for(&e) {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
