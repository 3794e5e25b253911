//! Test support utilities for bootkit integration tests.
//!
//! Provides reusable test environment setup and helper commands.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;

#[allow(unused_imports)]
pub use assertions::*;

use std::path::PathBuf;

use tempfile::TempDir;

pub const PASSPHRASE: &str = "correct horse battery staple";

/// Test environment with isolated temp directories.
///
/// Each test gets its own working dir and home dir. Child processes get
/// `HOME` and `BOOTKIT_HOME` pointed into the temp home, so tests can run
/// in parallel.
pub struct Test {
    /// Working directory for child processes
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");

        Self { dir, home }
    }

    /// State directory the binary writes to.
    pub fn state_dir(&self) -> PathBuf {
        self.home.path().join(".bootkit")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.state_dir().join("config.toml")
    }

    pub fn key_file(&self) -> PathBuf {
        self.state_dir().join(".key")
    }

    pub fn credentials_file(&self, env: &str) -> PathBuf {
        self.state_dir().join(format!("{}_credentials.enc", env))
    }

    /// Install an executable `npx` shell script in `<dir>/bin`.
    ///
    /// Pair with [`Test::cmd_with_fake_npx`] to run infra commands without
    /// Node.js.
    #[cfg(unix)]
    pub fn fake_npx(&self, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let bin = self.dir.path().join("bin");
        std::fs::create_dir_all(&bin).expect("failed to create bin dir");
        let path = bin.join("npx");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("failed to write npx");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to chmod npx");
    }

    /// Write a minimal initialized environment straight to the settings
    /// file, skipping the cloud calls `init project` makes.
    pub fn with_environment(env: &str, org: &str) -> Self {
        let t = Self::new();
        std::fs::create_dir_all(t.state_dir()).expect("failed to create state dir");
        std::fs::write(
            t.settings_file(),
            format!(
                "[environments.{}]\norg_name = \"{}\"\naws_profile = \"default\"\naws_region = \"us-east-1\"\naccount_id = \"123456789012\"\nuse_credentials = false\n",
                env, org
            ),
        )
        .expect("failed to write settings");
        t
    }
}
