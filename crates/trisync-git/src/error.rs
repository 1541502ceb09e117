//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all
//! [`GitRepo`](crate::GitRepo) methods. Expected branches of an operation
//! (a rejected push, a conflicting rebase) are *not* errors; they come back as
//! [`PushOutcome`](crate::PushOutcome) / [`RewriteOutcome`](crate::RewriteOutcome)
//! values. A `GitError` always means the operation could not be carried out.

use thiserror::Error;

use crate::types::GitOid;

/// Errors returned by [`GitRepo`](crate::GitRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested commit, ref or remote was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// The two commits share no history at all.
    #[error("{left} and {right} have no common ancestor")]
    NoMergeBase {
        /// First commit.
        left: GitOid,
        /// Second commit.
        right: GitOid,
    },

    /// The two commits have more than one best common ancestor
    /// (criss-cross history). Callers must not pick one arbitrarily.
    #[error("{left} and {right} have {} merge bases (criss-cross history)", .candidates.len())]
    AmbiguousMergeBase {
        /// First commit.
        left: GitOid,
        /// Second commit.
        right: GitOid,
        /// Every best common ancestor reported by the backend.
        candidates: Vec<GitOid>,
    },

    /// A `git` subprocess exited unsuccessfully. Network failures during
    /// fetch, pull and push surface through this variant unchanged.
    #[error("git command failed: {command}\nstderr: {stderr}")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// An OID string could not be parsed.
    #[error("invalid OID `{value}`: {reason}")]
    InvalidOid {
        /// The raw value that failed validation.
        value: String,
        /// Why validation failed.
        reason: String,
    },

    /// An I/O error occurred (process spawn, file system).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The backend returned an unclassified error.
    #[error("git backend error: {message}")]
    BackendError {
        /// Freeform error description from the backend.
        message: String,
    },
}

impl From<crate::types::OidParseError> for GitError {
    fn from(e: crate::types::OidParseError) -> Self {
        Self::InvalidOid {
            value: e.value,
            reason: e.reason,
        }
    }
}
