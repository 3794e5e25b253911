//! CDK subprocess runner.
//!
//! Invokes `npx cdk <verb>` with an explicit environment applied to the
//! child process only.

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::core::vault::AwsCredentials;
use crate::error::{Error, Result};

/// A CDK verb and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdkCommand {
    Bootstrap { account: String, region: String },
    Deploy,
    Destroy,
    Diff,
}

impl CdkCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            CdkCommand::Bootstrap { .. } => "bootstrap",
            CdkCommand::Deploy => "deploy",
            CdkCommand::Destroy => "destroy",
            CdkCommand::Diff => "diff",
        }
    }

    /// Arguments after `npx`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["cdk".to_string(), self.verb().to_string()];
        match self {
            CdkCommand::Bootstrap { account, region } => {
                args.push(format!("aws://{}/{}", account, region));
            }
            CdkCommand::Deploy => {
                args.extend(["--all", "--require-approval", "never"].map(String::from));
            }
            CdkCommand::Destroy => {
                args.extend(["--all", "--force"].map(String::from));
            }
            CdkCommand::Diff => {}
        }
        args
    }
}

/// Environment handed to the CDK child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdkEnv {
    pub profile: Option<String>,
    pub region: String,
    pub environment: String,
    pub org_name: String,
    pub credentials: Option<AwsCredentials>,
}

impl CdkEnv {
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            ("AWS_REGION", self.region.clone()),
            ("BOOTKIT_ENV", self.environment.clone()),
            ("BOOTKIT_ORG_NAME", self.org_name.clone()),
        ];
        if let Some(profile) = &self.profile {
            vars.push(("AWS_PROFILE", profile.clone()));
        }
        if let Some(creds) = &self.credentials {
            vars.push(("AWS_ACCESS_KEY_ID", creds.access_key_id.clone()));
            vars.push(("AWS_SECRET_ACCESS_KEY", creds.secret_access_key.clone()));
            if let Some(token) = &creds.session_token {
                vars.push(("AWS_SESSION_TOKEN", token.clone()));
            }
        }
        vars
    }
}

/// Runs CDK through a launcher program, `npx` unless overridden.
#[derive(Debug, Clone)]
pub struct Cdk {
    program: PathBuf,
    workdir: Option<PathBuf>,
}

impl Cdk {
    /// Find `npx` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if it is not installed.
    pub fn locate() -> Result<Self> {
        let program = which::which("npx").map_err(|_| {
            Error::Command("npx not found on PATH; install Node.js to run CDK".to_string())
        })?;
        debug!(program = %program.display(), "located npx");
        Ok(Self::with_program(program))
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workdir: None,
        }
    }

    /// Run in `dir` instead of the current directory.
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.workdir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Run `command`, inheriting stdout.
    ///
    /// CDK reports progress and diffs on stderr, so each stderr line is
    /// echoed to ours as it arrives and also collected. Returns the
    /// collected stderr.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the program cannot be started or exits
    /// non-zero.
    pub fn run(&self, command: &CdkCommand, env: &CdkEnv) -> Result<String> {
        let args = command.args();
        info!(verb = command.verb(), env = %env.environment, "running cdk");
        debug!(program = %self.program.display(), ?args, "spawning");

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .envs(env.vars().into_iter().map(|(k, v)| (k, OsString::from(v))))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::Command(format!(
                "failed to start {}: {}",
                self.program.display(),
                e
            ))
        })?;

        let mut captured = String::new();
        if let Some(stderr) = child.stderr.take() {
            captured = tee(stderr, &mut io::stderr().lock())?;
        }

        let status = child.wait()?;
        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(Error::Command(format!(
                "cdk {} exited with {}: {}",
                command.verb(),
                code,
                last_lines(&captured, 20)
            )));
        }

        Ok(captured)
    }
}

/// Copy `source` line by line into `sink`, returning everything copied.
fn tee(source: impl Read, sink: &mut impl Write) -> Result<String> {
    let mut reader = BufReader::new(source);
    let mut captured = String::new();
    let mut line = Vec::new();
    while reader.read_until(b'\n', &mut line)? > 0 {
        sink.write_all(&line)?;
        captured.push_str(&String::from_utf8_lossy(&line));
        line.clear();
    }
    sink.flush()?;
    Ok(captured)
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
