//! Fetch, pull and push via the `git` binary.
//!
//! gix has no high-level push, and shelling out keeps the operator's
//! credential helpers and transport config in play.

use tracing::{debug, warn};

use crate::cmd::{command_failed, run_git, run_git_raw};
use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::*;

/// Fragments of `git push` stderr that mean "the remote said no" rather than
/// "the push never happened".
const REJECTION_MARKERS: &[&str] = &[
    "[rejected]",
    "stale info",
    "non-fast-forward",
    "fetch first",
    "failed to push some refs",
];

pub fn fetch(repo: &GixRepo, remote: &str, options: FetchOptions) -> Result<(), GitError> {
    let mut args = vec!["fetch", remote];
    if options.prune {
        args.push("--prune");
        if options.tags {
            args.push("--prune-tags");
        }
    }
    if options.tags {
        args.push("--tags");
    }
    run_git(&repo.workdir, &args)?;
    Ok(())
}

pub fn pull(
    repo: &GixRepo,
    remote: &str,
    branch: &BranchName,
    options: PullOptions,
) -> Result<RewriteOutcome, GitError> {
    let mut args = vec!["pull"];
    args.push(if options.rebase { "--rebase" } else { "--no-rebase" });
    if options.autostash {
        args.push("--autostash");
    }
    args.push(remote);
    args.push(branch.as_str());

    let output = run_git_raw(&repo.workdir, &args)?;
    if output.status.success() {
        return Ok(RewriteOutcome::Clean);
    }
    // A conflict leaves a rebase (or merge) in progress; anything else is a
    // transport or setup failure and is surfaced as-is.
    match crate::status_impl::pending_operation(repo) {
        Some(PendingOperation::Rebase | PendingOperation::Merge) => {
            debug!(branch = %branch, "pull stopped on a conflict");
            Ok(RewriteOutcome::Conflict)
        }
        _ => Err(command_failed(&args, &output)),
    }
}

pub fn push(
    repo: &GixRepo,
    remote: &str,
    branch: &BranchName,
    mode: PushMode,
) -> Result<PushOutcome, GitError> {
    let full = branch.local_ref();
    let refspec = format!("{full}:{full}");
    let lease;
    let mut args = vec!["push", "--porcelain"];
    match mode {
        PushMode::Plain => {}
        PushMode::Lease { expected } => {
            // An empty expectation means "must not exist yet".
            let expect = expected.map(|oid| oid.to_string()).unwrap_or_default();
            lease = format!("--force-with-lease={full}:{expect}");
            args.push(lease.as_str());
        }
        PushMode::Force => args.push("--force"),
    }
    args.push(remote);
    args.push(refspec.as_str());

    let output = run_git_raw(&repo.workdir, &args)?;
    if output.status.success() {
        return Ok(PushOutcome::Accepted);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if REJECTION_MARKERS
        .iter()
        .any(|m| stdout.contains(m) || stderr.contains(m))
        && !stderr.contains("Could not read from remote repository")
    {
        warn!(branch = %branch, ?mode, "push rejected by remote");
        let details = format!("{}\n{}", stdout.trim(), stderr.trim());
        return Ok(PushOutcome::Rejected {
            details: details.trim().to_owned(),
        });
    }

    Err(command_failed(&args, &output))
}
