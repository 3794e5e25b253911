//! Command-line interface.

pub mod completions;
pub mod config;
pub mod creds;
pub mod infra;
pub mod init;
pub mod output;
pub mod resolve;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::paths::Paths;
use crate::error::Result;

/// Bootkit - bootstrap kit for an AWS-hosted web service.
#[derive(Parser)]
#[command(
    name = "bootkit",
    about = "Bootstrap AWS infrastructure and credentials for a web service",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// State directory (defaults to ~/.bootkit)
    #[arg(long, global = true, env = "BOOTKIT_HOME")]
    pub home: Option<PathBuf>,

    /// Vault passphrase, used only when no key file exists yet
    #[arg(long, global = true, env = "BOOTKIT_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Initialize a project environment or database credentials
    Init {
        #[command(subcommand)]
        action: InitAction,
    },

    /// Run CDK against an initialized environment
    Infra {
        #[command(subcommand)]
        action: InfraAction,
    },

    /// Read and write settings by dotted key
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Inspect or mirror stored credentials
    Creds {
        #[command(subcommand)]
        action: CredsAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Deployment environments.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Test,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Prod => "prod",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Init subcommands.
#[derive(Subcommand)]
pub enum InitAction {
    /// Create the state bucket, lock table and CDK asset bucket
    Project {
        /// Organization name, used as a prefix for every resource
        #[arg(long)]
        org_name: String,
        /// AWS profile to use
        #[arg(long, default_value = "default")]
        aws_profile: String,
        /// AWS region
        #[arg(long, default_value = "us-east-1")]
        aws_region: String,
        /// Environment to initialize
        #[arg(long, value_enum, default_value_t = Environment::Dev)]
        environment: Environment,
        /// Prompt for access keys and store them in the vault
        #[arg(long)]
        use_credentials: bool,
    },

    /// Store database credentials in the vault
    Database {
        #[arg(long, value_enum, default_value_t = Environment::Dev)]
        env: Environment,
        #[arg(long)]
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        host: String,
        #[arg(long)]
        port: u16,
        /// Database name
        #[arg(long)]
        database: String,
        /// Mirror to Secrets Manager without asking
        #[arg(long, conflicts_with = "no_mirror")]
        mirror: bool,
        /// Never mirror to Secrets Manager
        #[arg(long)]
        no_mirror: bool,
    },
}

/// Infra subcommands.
#[derive(Subcommand)]
pub enum InfraAction {
    /// Bootstrap the CDK toolkit in the environment's account
    Bootstrap(InfraArgs),
    /// Deploy all stacks
    Deploy(InfraArgs),
    /// Destroy all stacks
    Destroy {
        #[command(flatten)]
        args: InfraArgs,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Show the environment and pending stack changes
    Status(InfraArgs),
}

/// Flags shared by every infra subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct InfraArgs {
    #[arg(long, value_enum, default_value_t = Environment::Dev)]
    pub env: Environment,
    /// Override the stored AWS profile
    #[arg(long)]
    pub aws_profile: Option<String>,
    /// Override the stored AWS region
    #[arg(long)]
    pub aws_region: Option<String>,
    /// Override the stored organization name
    #[arg(long)]
    pub org_name: Option<String>,
    /// Directory containing the CDK app
    #[arg(long)]
    pub app_dir: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a value
    Get {
        /// Dotted key, e.g. environments.dev.aws_region
        key: String,
    },
    /// Set a value (true/false and integers keep their type)
    Set { key: String, value: String },
    /// Remove a value
    Unset { key: String },
    /// Print the whole settings file
    Show,
}

/// Creds subcommands.
#[derive(Subcommand)]
pub enum CredsAction {
    /// List stored credentials with values masked
    Show {
        #[arg(long, value_enum, default_value_t = Environment::Dev)]
        env: Environment,
    },
    /// Upload the credential bundle to Secrets Manager
    Mirror {
        #[arg(long, value_enum, default_value_t = Environment::Dev)]
        env: Environment,
    },
}

/// Execute a command.
pub fn execute(cli: Cli) -> Result<()> {
    let ctx = resolve::Context::new(Paths::resolve(cli.home.as_deref())?, cli.passphrase);

    match cli.command {
        Command::Init { action } => match action {
            InitAction::Project {
                org_name,
                aws_profile,
                aws_region,
                environment,
                use_credentials,
            } => init::project(
                &ctx,
                &init::ProjectOptions {
                    org_name,
                    aws_profile,
                    aws_region,
                    environment,
                    use_credentials,
                },
            ),
            InitAction::Database {
                env,
                username,
                password,
                host,
                port,
                database,
                mirror,
                no_mirror,
            } => init::database(
                &ctx,
                &init::DatabaseOptions {
                    env,
                    username,
                    password,
                    host,
                    port,
                    database,
                    mirror: match (mirror, no_mirror) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    },
                },
            ),
        },
        Command::Infra { action } => match action {
            InfraAction::Bootstrap(args) => infra::bootstrap(&ctx, &args),
            InfraAction::Deploy(args) => infra::deploy(&ctx, &args),
            InfraAction::Destroy { args, force } => infra::destroy(&ctx, &args, force),
            InfraAction::Status(args) => infra::status(&ctx, &args),
        },
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config::get(&ctx, &key),
            ConfigAction::Set { key, value } => config::set(&ctx, &key, &value),
            ConfigAction::Unset { key } => config::unset(&ctx, &key),
            ConfigAction::Show => config::show(&ctx),
        },
        Command::Creds { action } => match action {
            CredsAction::Show { env } => creds::show(&ctx, env),
            CredsAction::Mirror { env } => creds::mirror(&ctx, env),
        },
        Command::Completions { shell } => completions::execute(shell),
    }
}
