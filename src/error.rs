//! Error types for the reconciliation engine.
//!
//! Two channels are kept apart. Expected branches of a run (the operator
//! declined, a rebase needs manual resolution, nothing to do) are
//! [`SyncDecision`](crate::decision::SyncDecision) values. A [`SyncError`]
//! means the run could not be carried out at all: a startup precondition
//! failed, git itself failed, or the prompt channel broke.

use std::io;

use thiserror::Error;
use trisync_git::{GitError, GitOid};

use crate::config::ConfigError;

/// A condition that must hold before any operation starts.
#[derive(Debug, Error)]
pub enum Precondition {
    /// The index holds conflict entries from an earlier operation.
    #[error("unresolved merge conflicts in the working tree; resolve them or run `trisync abort`")]
    UnmergedPaths,

    /// The configured remote does not exist.
    #[error("remote '{remote}' is not configured; add it with `git remote add {remote} <url>`")]
    NoRemote {
        /// Remote name that was looked up.
        remote: String,
    },

    /// None of the integration candidates exists on the remote.
    #[error("no integration branch found on '{remote}' (looked for {candidates}); fetch first or set remote.integration")]
    NoIntegrationBranch {
        /// Remote name.
        remote: String,
        /// Candidates tried, comma separated.
        candidates: String,
    },

    /// HEAD is not on a branch.
    #[error("HEAD is detached; check out your feature branch first")]
    DetachedHead,

    /// The checked-out branch is the integration branch itself.
    #[error("refusing to operate on the integration branch '{branch}'; check out your feature branch")]
    OnIntegrationBranch {
        /// The integration branch name.
        branch: String,
    },

    /// Criss-cross history: more than one best common ancestor.
    #[error(
        "{left} and {right} have {} best common ancestors; linearize the history by hand",
        .candidates.len()
    )]
    AmbiguousBase {
        /// First commit.
        left: GitOid,
        /// Second commit.
        right: GitOid,
        /// Every best common ancestor.
        candidates: Vec<GitOid>,
    },

    /// The histories share no commit.
    #[error("{left} and {right} share no history")]
    NoCommonAncestor {
        /// First commit.
        left: GitOid,
        /// Second commit.
        right: GitOid,
    },

    /// The operation rewrites the working tree and needs it clean.
    #[error("working tree has uncommitted changes; commit or stash them first")]
    DirtyWorkingTree,
}

/// Fatal errors of an engine run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A startup (or mid-run) precondition is violated.
    #[error(transparent)]
    Precondition(#[from] Precondition),

    /// The remote refused a fast-forward push.
    #[error("push of '{branch}' was rejected: {details}")]
    PushRejected {
        /// Branch that was pushed.
        branch: String,
        /// Backend message.
        details: String,
    },

    /// git failed.
    #[error(transparent)]
    Backend(GitError),

    /// `.trisync.toml` is unreadable or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The confirmation channel failed (closed stdin, exhausted script).
    #[error("confirmation prompt failed: {0}")]
    Prompt(#[source] io::Error),
}

impl From<GitError> for SyncError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::AmbiguousMergeBase {
                left,
                right,
                candidates,
            } => Precondition::AmbiguousBase {
                left,
                right,
                candidates,
            }
            .into(),
            GitError::NoMergeBase { left, right } => {
                Precondition::NoCommonAncestor { left, right }.into()
            }
            other => Self::Backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u8) -> GitOid {
        GitOid::from_bytes([n; 20])
    }

    #[test]
    fn ambiguous_merge_base_becomes_precondition() {
        let err: SyncError = GitError::AmbiguousMergeBase {
            left: oid(1),
            right: oid(2),
            candidates: vec![oid(3), oid(4)],
        }
        .into();
        assert!(matches!(
            err,
            SyncError::Precondition(Precondition::AmbiguousBase { ref candidates, .. })
                if candidates.len() == 2
        ));
        assert!(err.to_string().contains("2 best common ancestors"));
    }

    #[test]
    fn missing_merge_base_becomes_precondition() {
        let err: SyncError = GitError::NoMergeBase {
            left: oid(1),
            right: oid(2),
        }
        .into();
        assert!(matches!(
            err,
            SyncError::Precondition(Precondition::NoCommonAncestor { .. })
        ));
    }

    #[test]
    fn other_git_errors_stay_backend_errors() {
        let err: SyncError = GitError::CommandFailed {
            command: "git fetch origin".to_owned(),
            stderr: "fatal: unable to access".to_owned(),
        }
        .into();
        assert!(matches!(err, SyncError::Backend(_)));
        assert!(err.to_string().contains("git fetch origin"));
    }
}
