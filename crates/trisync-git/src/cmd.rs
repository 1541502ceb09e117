//! `git` subprocess plumbing shared by the CLI-backed operations.
//!
//! Network operations, rewrites and commits go through the `git` binary so
//! they honour the operator's credential helpers, hooks and config exactly as
//! a hand-typed command would.

use std::path::Path;
use std::process::{Command, Output};

use tracing::debug;

use crate::error::GitError;

/// Build a `git` command rooted at `workdir`.
///
/// Messages are forced to the C locale so rejection and conflict output can
/// be recognised.
pub(crate) fn git_command(workdir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);
    cmd.env("LC_ALL", "C");
    cmd
}

/// Run `git <args>` and return its raw output regardless of exit status.
pub(crate) fn run_git_raw(workdir: &Path, args: &[&str]) -> Result<Output, GitError> {
    debug!(command = %format!("git {}", args.join(" ")), "running git");
    Ok(git_command(workdir).args(args).output()?)
}

/// Run `git <args>`, failing with [`GitError::CommandFailed`] on a non-zero
/// exit.
pub(crate) fn run_git(workdir: &Path, args: &[&str]) -> Result<Output, GitError> {
    let output = run_git_raw(workdir, args)?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(command_failed(args, &output))
    }
}

/// Run `git <args>` and return trimmed stdout.
pub(crate) fn run_git_stdout(workdir: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = run_git(workdir, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Run a `git` command whose exit status is a yes/no answer (0 = yes,
/// 1 = no). Anything else is an error.
pub(crate) fn run_git_predicate(workdir: &Path, args: &[&str]) -> Result<bool, GitError> {
    let output = run_git_raw(workdir, args)?;
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => Err(command_failed(args, &output)),
    }
}

pub(crate) fn command_failed(args: &[&str], output: &Output) -> GitError {
    GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    }
}
