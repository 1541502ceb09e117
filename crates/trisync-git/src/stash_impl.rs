//! Stash and submodule pass-throughs.

use crate::cmd::{run_git, run_git_stdout};
use crate::error::GitError;
use crate::gix_repo::GixRepo;

pub fn stash_count(repo: &GixRepo) -> Result<usize, GitError> {
    let list = run_git_stdout(&repo.workdir, &["stash", "list"])?;
    Ok(list.lines().filter(|l| !l.trim().is_empty()).count())
}

pub fn stash_push(repo: &GixRepo) -> Result<(), GitError> {
    run_git(&repo.workdir, &["stash", "push", "--include-untracked"])?;
    Ok(())
}

pub fn stash_pop(repo: &GixRepo) -> Result<(), GitError> {
    run_git(&repo.workdir, &["stash", "pop"])?;
    Ok(())
}

pub fn submodule_update(repo: &GixRepo, remote_latest: bool) -> Result<(), GitError> {
    let mut args = vec!["submodule", "update", "--init", "--recursive", "--force"];
    if remote_latest {
        args.push("--remote");
    }
    run_git(&repo.workdir, &args)?;
    Ok(())
}
