//! `bootkit completions <shell>`.
//!
//! Prints a completion script for the whole command tree to stdout, e.g.
//! `bootkit completions zsh > ~/.zfunc/_bootkit`.

use clap::CommandFactory;
use clap_complete::Shell as Target;

use crate::cli::{Cli, Shell};
use crate::error::Result;

const BIN_NAME: &str = "bootkit";

impl From<Shell> for Target {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => Target::Bash,
            Shell::Zsh => Target::Zsh,
            Shell::Fish => Target::Fish,
            Shell::PowerShell => Target::PowerShell,
        }
    }
}

pub fn execute(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(
        Target::from(shell),
        &mut cmd,
        BIN_NAME,
        &mut std::io::stdout().lock(),
    );
    Ok(())
}
