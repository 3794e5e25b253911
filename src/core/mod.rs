//! Core library components.
//!
//! Settings storage, the credential vault, cloud resource helpers and the
//! CDK runner. Nothing here prints to the terminal.

pub mod cloud;
pub mod constants;
pub mod files;
pub mod infra;
pub mod paths;
pub mod settings;
pub mod vault;
