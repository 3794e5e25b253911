//! Command helper methods for Test.

use super::{Test, PASSPHRASE};
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a bootkit command isolated to this test.
    ///
    /// Returns a Command configured with:
    /// - HOME set to the temporary home directory
    /// - BOOTKIT_HOME pointing at `<home>/.bootkit`
    /// - BOOTKIT_PASSPHRASE and BOOTKIT_LOG cleared
    /// - NO_COLOR set so output can be matched literally
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("bootkit").expect("failed to find bootkit binary");
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("BOOTKIT_HOME", self.state_dir());
        cmd.env_remove("BOOTKIT_PASSPHRASE");
        cmd.env_remove("BOOTKIT_LOG");
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Like [`Test::cmd`], with `<dir>/bin` first on `PATH`.
    pub fn cmd_with_fake_npx(&self) -> Command {
        let bin = self.dir.path().join("bin");
        let path = match std::env::var_os("PATH") {
            Some(rest) => {
                let mut dirs = vec![bin];
                dirs.extend(std::env::split_paths(&rest));
                std::env::join_paths(dirs).expect("failed to build PATH")
            }
            None => bin.into_os_string(),
        };

        let mut cmd = self.cmd();
        cmd.env("PATH", path);
        cmd
    }

    /// Shortcut for `bootkit init database --no-mirror`.
    pub fn init_database(&self, env: &str, password: &str) -> Output {
        self.init_database_at(env, "db.internal", password)
    }

    /// `init database --no-mirror` against a specific host.
    pub fn init_database_at(&self, env: &str, host: &str, password: &str) -> Output {
        self.cmd()
            .env("BOOTKIT_PASSPHRASE", PASSPHRASE)
            .args([
                "init",
                "database",
                "--env",
                env,
                "--username",
                "app",
                "--password",
                password,
                "--host",
                host,
                "--port",
                "5432",
                "--database",
                "main",
                "--no-mirror",
            ])
            .output()
            .expect("failed to run bootkit init database")
    }

    pub fn config_set(&self, key: &str, value: &str) -> Output {
        self.cmd()
            .args(["config", "set", key, value])
            .output()
            .expect("failed to run bootkit config set")
    }

    pub fn config_get(&self, key: &str) -> Output {
        self.cmd()
            .args(["config", "get", key])
            .output()
            .expect("failed to run bootkit config get")
    }

    pub fn creds_show(&self, env: &str) -> Output {
        self.cmd()
            .args(["creds", "show", "--env", env])
            .output()
            .expect("failed to run bootkit creds show")
    }
}
