//! Bootkit - bootstrap kit for an AWS-hosted web service.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── init          # init project / init database
//! │   ├── infra         # CDK bootstrap, deploy, destroy, status
//! │   ├── config        # Settings get/set/unset/show
//! │   ├── creds         # Show or mirror stored credentials
//! │   ├── resolve       # Key source, cloud config and org resolution
//! │   ├── output        # Terminal output helpers
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── settings      # config.toml with dotted-path access
//!     ├── vault/        # Credential vault
//!     │   ├── key       # PBKDF2 key acquisition
//!     │   ├── cipher    # AES-256-GCM seal/open
//!     │   ├── bundle    # Secret bundle and typed views
//!     │   └── mirror    # Managed secret store trait
//!     ├── cloud/        # Cloud resource helpers
//!     │   └── aws       # STS, S3, DynamoDB, ECR, Secrets Manager
//!     ├── infra         # npx cdk subprocess runner
//!     ├── paths         # Home directory layout
//!     ├── files         # Owner-only file writes
//!     └── constants     # Names and parameters
//! ```
//!
//! # Features
//!
//! - `aws` (default): AWS SDK backed cloud helpers and the `bootkit` binary

#[cfg(feature = "aws")]
pub mod cli;
pub mod core;
pub mod error;
