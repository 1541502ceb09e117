//! The [`GitRepo`] trait: the single abstraction boundary between trisync
//! and git.
//!
//! The reconciliation engine only ever talks to git through this trait. It is
//! object-safe so callers can hold a `&dyn GitRepo`.
//!
//! | Group        | Methods                                                        |
//! |--------------|----------------------------------------------------------------|
//! | Session      | `current_branch`, `has_remote`, `has_unmerged_paths`, `read_config` |
//! | Refs         | `resolve_ref`, `read_commit`                                   |
//! | Ancestry     | `merge_base`, `commits_between`, `would_conflict`              |
//! | Status       | `is_dirty`, `has_changes`, `pending_operation`                 |
//! | Remote       | `fetch`, `pull`, `push`                                        |
//! | Rewrite      | `rewrite_onto`, `abort_rewrite`, `reset_to`, `commit_all`, `abort_operation` |
//! | Housekeeping | `stash_count`, `stash_push`, `stash_pop`, `submodule_update`   |

use crate::error::GitError;
use crate::types::{
    BranchName, CommitInfo, FetchOptions, GitOid, PendingOperation, PullOptions, PushMode,
    PushOutcome, ResetMode, RewriteOutcome,
};

/// Everything the engine needs from a repository.
///
/// All methods take `&self`; implementations that mutate state do so through
/// the repository on disk (or interior mutability for test doubles). Calls are
/// strictly sequential; implementations need not be `Sync`.
pub trait GitRepo {
    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// The branch checked out in the working tree, or `None` for a detached
    /// HEAD.
    fn current_branch(&self) -> Result<Option<BranchName>, GitError>;

    /// Whether a remote with this name is configured.
    fn has_remote(&self, remote: &str) -> Result<bool, GitError>;

    /// Whether the index holds unresolved conflict entries.
    ///
    /// Replaces: `git ls-files --unmerged`.
    fn has_unmerged_paths(&self) -> Result<bool, GitError>;

    /// Read a git config value (`user.email`, ...). `None` if unset.
    fn read_config(&self, key: &str) -> Result<Option<String>, GitError>;

    // -----------------------------------------------------------------------
    // Refs
    // -----------------------------------------------------------------------

    /// Resolve a full ref name (`refs/heads/x`, `refs/remotes/origin/x`) to
    /// the commit it points at. `None` if the ref does not exist.
    fn resolve_ref(&self, name: &str) -> Result<Option<GitOid>, GitError>;

    /// Read a commit's metadata.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    // -----------------------------------------------------------------------
    // Ancestry
    // -----------------------------------------------------------------------

    /// The unique best common ancestor of `a` and `b`.
    ///
    /// # Errors
    /// [`GitError::NoMergeBase`] when the histories are unrelated and
    /// [`GitError::AmbiguousMergeBase`] when more than one best ancestor
    /// exists. Implementations must never pick one of several candidates.
    ///
    /// Replaces: `git merge-base --all <a> <b>`.
    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<GitOid, GitError>;

    /// Commits reachable from `to` but not from `from`, newest first.
    ///
    /// Replaces: `git rev-list <from>..<to>`.
    fn commits_between(&self, from: GitOid, to: GitOid) -> Result<Vec<GitOid>, GitError>;

    /// Whether combining the trees of `a` and `b` (three-way, against their
    /// merge base) would conflict. Touches neither the working tree, the
    /// index, nor any ref; calling it repeatedly gives the same answer.
    ///
    /// Replaces: `git merge-tree --write-tree <a> <b>`.
    fn would_conflict(&self, a: GitOid, b: GitOid) -> Result<bool, GitError>;

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Whether tracked files differ from HEAD (working tree or index).
    fn is_dirty(&self) -> Result<bool, GitError>;

    /// Like [`is_dirty`](Self::is_dirty) but also counts untracked files.
    ///
    /// Replaces: `git status --porcelain` being non-empty.
    fn has_changes(&self) -> Result<bool, GitError>;

    /// Whether the index differs from HEAD. Unstaged edits don't count.
    ///
    /// Replaces: `git diff --cached --quiet` failing.
    fn has_staged_changes(&self) -> Result<bool, GitError>;

    /// A merge, rebase, cherry-pick or revert left in progress, if any.
    fn pending_operation(&self) -> Result<Option<PendingOperation>, GitError>;

    // -----------------------------------------------------------------------
    // Remote
    // -----------------------------------------------------------------------

    /// Update remote-tracking refs from `remote`.
    ///
    /// Replaces: `git fetch <remote> [--prune --prune-tags] [--tags]`.
    fn fetch(&self, remote: &str, options: FetchOptions) -> Result<(), GitError>;

    /// Integrate `remote`'s copy of `branch` into the checked-out branch.
    ///
    /// Replaces: `git pull [--rebase] [--autostash] <remote> <branch>`.
    fn pull(
        &self,
        remote: &str,
        branch: &BranchName,
        options: PullOptions,
    ) -> Result<RewriteOutcome, GitError>;

    /// Push the local `branch` to the same name on `remote`.
    ///
    /// A refusal by the remote is [`PushOutcome::Rejected`]; only transport
    /// and process failures are errors. On acceptance the remote-tracking
    /// ref is updated as well.
    ///
    /// Replaces: `git push [--force-with-lease=<ref>:<expect> | --force] <remote> <branch>`.
    fn push(
        &self,
        remote: &str,
        branch: &BranchName,
        mode: PushMode,
    ) -> Result<PushOutcome, GitError>;

    // -----------------------------------------------------------------------
    // Rewrite
    // -----------------------------------------------------------------------

    /// Replay the checked-out branch's commits onto `target`.
    ///
    /// Replaces: `git rebase [--autostash] <target>`.
    fn rewrite_onto(&self, target: GitOid, autostash: bool) -> Result<RewriteOutcome, GitError>;

    /// Abandon a rewrite stopped on a conflict, restoring the branch and
    /// working tree to their state before the rewrite began.
    ///
    /// Replaces: `git rebase --abort`.
    fn abort_rewrite(&self) -> Result<(), GitError>;

    /// Move the checked-out branch to `oid`, keeping the working tree. The
    /// discarded commits' combined diff stays staged ([`ResetMode::Soft`]) or
    /// becomes unstaged ([`ResetMode::Mixed`]).
    ///
    /// Replaces: `git reset --soft|--mixed <oid>`.
    fn reset_to(&self, oid: GitOid, mode: ResetMode) -> Result<(), GitError>;

    /// Commit the staged changes; when nothing is staged, stage everything
    /// (including untracked files) first. Returns `None` without committing
    /// when there is nothing to commit at all.
    ///
    /// Replaces: `[git add -A &&] git commit -m <message>`.
    fn commit_all(&self, message: &str) -> Result<Option<GitOid>, GitError>;

    /// Abort an in-progress operation of the given kind.
    ///
    /// Replaces: `git merge|rebase|cherry-pick|revert --abort`.
    fn abort_operation(&self, operation: PendingOperation) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Housekeeping
    // -----------------------------------------------------------------------

    /// Number of entries in the stash.
    fn stash_count(&self) -> Result<usize, GitError>;

    /// Stash uncommitted changes (`git stash push`).
    fn stash_push(&self) -> Result<(), GitError>;

    /// Re-apply and drop the newest stash entry (`git stash pop`).
    fn stash_pop(&self) -> Result<(), GitError>;

    /// `git submodule update --init --recursive --force [--remote]`.
    fn submodule_update(&self, remote_latest: bool) -> Result<(), GitError>;
}
