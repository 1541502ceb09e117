//! History-rewriting operations: rebase, abort, reset and commit.

use crate::cmd::{command_failed, run_git, run_git_predicate, run_git_raw, run_git_stdout};
use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::*;

pub fn rewrite_onto(repo: &GixRepo, target: GitOid, autostash: bool) -> Result<RewriteOutcome, GitError> {
    let onto = target.to_string();
    let mut args = vec!["rebase"];
    if autostash {
        args.push("--autostash");
    }
    args.push(onto.as_str());

    let output = run_git_raw(&repo.workdir, &args)?;
    if output.status.success() {
        return Ok(RewriteOutcome::Clean);
    }
    if crate::status_impl::pending_operation(repo) == Some(PendingOperation::Rebase) {
        return Ok(RewriteOutcome::Conflict);
    }
    Err(command_failed(&args, &output))
}

pub fn abort_operation(repo: &GixRepo, operation: PendingOperation) -> Result<(), GitError> {
    let verb = match operation {
        PendingOperation::Merge => "merge",
        PendingOperation::Rebase => "rebase",
        PendingOperation::CherryPick => "cherry-pick",
        PendingOperation::Revert => "revert",
    };
    run_git(&repo.workdir, &[verb, "--abort"])?;
    Ok(())
}

pub fn reset_to(repo: &GixRepo, oid: GitOid, mode: ResetMode) -> Result<(), GitError> {
    let target = oid.to_string();
    let flag = match mode {
        ResetMode::Soft => "--soft",
        ResetMode::Mixed => "--mixed",
    };
    run_git(&repo.workdir, &["reset", "--quiet", flag, target.as_str()])?;
    Ok(())
}

pub fn commit_all(repo: &GixRepo, message: &str) -> Result<Option<GitOid>, GitError> {
    if !crate::status_impl::has_changes(repo)? {
        return Ok(None);
    }
    // `diff --cached --quiet` exits 0 when nothing is staged.
    let nothing_staged = run_git_predicate(&repo.workdir, &["diff", "--cached", "--quiet"])?;
    if nothing_staged {
        run_git(&repo.workdir, &["add", "--all"])?;
    }
    run_git(&repo.workdir, &["commit", "--quiet", "-m", message])?;
    let head = run_git_stdout(&repo.workdir, &["rev-parse", "HEAD"])?;
    Ok(Some(head.parse()?))
}
