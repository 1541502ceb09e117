//! The production implementation of [`GitRepo`].

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::*;

/// A [`GitRepo`] backed by [gix](https://github.com/GitoxideLabs/gitoxide)
/// for local reads and by the `git` binary for everything that talks to a
/// remote or rewrites history.
///
/// Construct via [`GixRepo::open`].
pub struct GixRepo {
    pub(crate) repo: gix::Repository,
    pub(crate) workdir: PathBuf,
}

impl GixRepo {
    /// Open the git repository containing `path` (searching upwards).
    ///
    /// # Errors
    /// Fails when no repository is found or the repository is bare.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = gix::discover(path).map_err(|e| GitError::NotFound {
            message: format!("no git repository at or above {}: {e}", path.display()),
        })?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| GitError::BackendError {
                message: format!("{} is a bare repository", path.display()),
            })?;
        Ok(Self { repo, workdir })
    }

    /// Root of the working tree.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

impl GitRepo for GixRepo {
    // === Session ===
    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        crate::refs_impl::current_branch(self)
    }

    fn has_remote(&self, remote: &str) -> Result<bool, GitError> {
        crate::refs_impl::has_remote(self, remote)
    }

    fn has_unmerged_paths(&self) -> Result<bool, GitError> {
        crate::status_impl::has_unmerged_paths(self)
    }

    fn read_config(&self, key: &str) -> Result<Option<String>, GitError> {
        crate::refs_impl::read_config(self, key)
    }

    // === Refs ===
    fn resolve_ref(&self, name: &str) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::resolve_ref(self, name)
    }

    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        crate::refs_impl::read_commit(self, oid)
    }

    // === Ancestry ===
    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<GitOid, GitError> {
        crate::refs_impl::merge_base(self, a, b)
    }

    fn commits_between(&self, from: GitOid, to: GitOid) -> Result<Vec<GitOid>, GitError> {
        crate::refs_impl::commits_between(self, from, to)
    }

    fn would_conflict(&self, a: GitOid, b: GitOid) -> Result<bool, GitError> {
        crate::refs_impl::would_conflict(self, a, b)
    }

    // === Status ===
    fn is_dirty(&self) -> Result<bool, GitError> {
        crate::status_impl::is_dirty(self)
    }

    fn has_changes(&self) -> Result<bool, GitError> {
        crate::status_impl::has_changes(self)
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        crate::status_impl::has_staged_changes(self)
    }

    fn pending_operation(&self) -> Result<Option<PendingOperation>, GitError> {
        Ok(crate::status_impl::pending_operation(self))
    }

    // === Remote ===
    fn fetch(&self, remote: &str, options: FetchOptions) -> Result<(), GitError> {
        crate::remote_impl::fetch(self, remote, options)
    }

    fn pull(
        &self,
        remote: &str,
        branch: &BranchName,
        options: PullOptions,
    ) -> Result<RewriteOutcome, GitError> {
        crate::remote_impl::pull(self, remote, branch, options)
    }

    fn push(
        &self,
        remote: &str,
        branch: &BranchName,
        mode: PushMode,
    ) -> Result<PushOutcome, GitError> {
        crate::remote_impl::push(self, remote, branch, mode)
    }

    // === Rewrite ===
    fn rewrite_onto(&self, target: GitOid, autostash: bool) -> Result<RewriteOutcome, GitError> {
        crate::rewrite_impl::rewrite_onto(self, target, autostash)
    }

    fn abort_rewrite(&self) -> Result<(), GitError> {
        crate::rewrite_impl::abort_operation(self, PendingOperation::Rebase)
    }

    fn reset_to(&self, oid: GitOid, mode: ResetMode) -> Result<(), GitError> {
        crate::rewrite_impl::reset_to(self, oid, mode)
    }

    fn commit_all(&self, message: &str) -> Result<Option<GitOid>, GitError> {
        crate::rewrite_impl::commit_all(self, message)
    }

    fn abort_operation(&self, operation: PendingOperation) -> Result<(), GitError> {
        crate::rewrite_impl::abort_operation(self, operation)
    }

    // === Housekeeping ===
    fn stash_count(&self) -> Result<usize, GitError> {
        crate::stash_impl::stash_count(self)
    }

    fn stash_push(&self) -> Result<(), GitError> {
        crate::stash_impl::stash_push(self)
    }

    fn stash_pop(&self) -> Result<(), GitError> {
        crate::stash_impl::stash_pop(self)
    }

    fn submodule_update(&self, remote_latest: bool) -> Result<(), GitError> {
        crate::stash_impl::submodule_update(self, remote_latest)
    }
}
