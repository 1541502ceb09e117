//! Working-tree status and in-progress operation detection.

use crate::cmd::{run_git_predicate, run_git_stdout};
use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::PendingOperation;

pub fn is_dirty(repo: &GixRepo) -> Result<bool, GitError> {
    repo.repo
        .is_dirty()
        .map_err(|e| GitError::BackendError {
            message: e.to_string(),
        })
}

pub fn has_changes(repo: &GixRepo) -> Result<bool, GitError> {
    let porcelain = run_git_stdout(&repo.workdir, &["status", "--porcelain"])?;
    Ok(!porcelain.is_empty())
}

pub fn has_staged_changes(repo: &GixRepo) -> Result<bool, GitError> {
    let clean = run_git_predicate(&repo.workdir, &["diff", "--cached", "--quiet"])?;
    Ok(!clean)
}

pub fn has_unmerged_paths(repo: &GixRepo) -> Result<bool, GitError> {
    let unmerged = run_git_stdout(&repo.workdir, &["ls-files", "--unmerged"])?;
    Ok(!unmerged.is_empty())
}

/// Inspect the marker files git leaves in the (per-worktree) git dir.
pub fn pending_operation(repo: &GixRepo) -> Option<PendingOperation> {
    let git_dir = repo.repo.git_dir();
    if git_dir.join("MERGE_HEAD").exists() {
        Some(PendingOperation::Merge)
    } else if git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists() {
        Some(PendingOperation::Rebase)
    } else if git_dir.join("CHERRY_PICK_HEAD").exists() {
        Some(PendingOperation::CherryPick)
    } else if git_dir.join("REVERT_HEAD").exists() {
        Some(PendingOperation::Revert)
    } else {
        None
    }
}
