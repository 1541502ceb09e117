//! Value types shared between the [`GitRepo`](crate::GitRepo) trait and its
//! callers.
//!
//! Nothing in here names a gix type; the backend is an implementation detail.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// GitOid
// ---------------------------------------------------------------------------

/// A git commit identifier (SHA-1, 20 bytes).
///
/// `Copy`, totally ordered on bytes only. Ordering carries no ancestry or time
/// meaning; use [`GitRepo::merge_base`](crate::GitRepo::merge_base) and
/// [`CommitInfo`] for that.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GitOid([u8; 20]);

impl GitOid {
    /// Create a `GitOid` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The first 8 hex characters, for operator-facing messages.
    #[must_use]
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(8);
        s
    }
}

impl fmt::Display for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitOid({})", self.short())
    }
}

impl FromStr for GitOid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 40 {
            return Err(OidParseError {
                value: s.to_owned(),
                reason: format!("expected 40 hex characters, got {}", s.len()),
            });
        }
        let mut bytes = [0u8; 20];
        for (slot, pair) in bytes.iter_mut().zip(s.as_bytes().chunks(2)) {
            let digit = |b: u8| {
                (b as char).to_digit(16).ok_or_else(|| OidParseError {
                    value: s.to_owned(),
                    reason: format!("invalid hex digit '{}'", b as char),
                })
            };
            let hi = digit(pair[0])?;
            let lo = digit(pair[1])?;
            // Both digits are < 16, so the combined value fits a byte.
            *slot = u8::try_from((hi << 4) | lo).unwrap_or_default();
        }
        Ok(Self(bytes))
    }
}

/// Error from parsing a hex string into a [`GitOid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidParseError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid OID {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for OidParseError {}

// ---------------------------------------------------------------------------
// BranchName
// ---------------------------------------------------------------------------

/// A validated short branch name (`feature/login`, not `refs/heads/...`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    /// Validate and wrap a short branch name.
    ///
    /// # Errors
    /// Returns an error for empty names, names starting with `-` or `refs/`,
    /// and names containing whitespace, `..`, `~`, `^`, `:` or `\`.
    pub fn new(name: &str) -> Result<Self, BranchNameError> {
        let reason = if name.is_empty() {
            Some("branch name must not be empty")
        } else if name.starts_with('-') {
            Some("branch name must not start with '-'")
        } else if name.starts_with("refs/") {
            Some("expected a short branch name, not a full ref")
        } else if name.contains("..") {
            Some("branch name must not contain '..'")
        } else if name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '~' | '^' | ':' | '\\' | '?' | '*' | '['))
        {
            Some("branch name contains a forbidden character")
        } else if name.ends_with('/') || name.ends_with(".lock") {
            Some("branch name must not end with '/' or '.lock'")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(BranchNameError {
                value: name.to_owned(),
                reason: reason.to_owned(),
            }),
            None => Ok(Self(name.to_owned())),
        }
    }

    /// The short name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `refs/heads/<name>`.
    #[must_use]
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// `refs/remotes/<remote>/<name>`.
    #[must_use]
    pub fn tracking_ref(&self, remote: &str) -> String {
        format!("refs/remotes/{remote}/{}", self.0)
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error from validating a [`BranchName`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchNameError {
    /// The rejected name.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for BranchNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid branch name {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for BranchNameError {}

// ---------------------------------------------------------------------------
// CommitInfo
// ---------------------------------------------------------------------------

/// Metadata of a single commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitInfo {
    /// The commit's own id.
    pub oid: GitOid,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Authoring time, seconds since the Unix epoch.
    pub author_time: i64,
    /// Committer time; differs from `author_time` once a commit is rebased.
    pub commit_time: i64,
    /// First line of the message.
    pub summary: String,
}

impl fmt::Display for CommitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ {} ][ {} <{}> ][ {} ][ {} ]",
            self.summary,
            self.author_name,
            self.author_email,
            self.author_time,
            self.oid.short()
        )
    }
}

// ---------------------------------------------------------------------------
// Operation options and outcomes
// ---------------------------------------------------------------------------

/// Options for [`GitRepo::fetch`](crate::GitRepo::fetch).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    /// Drop remote-tracking refs (and tags) that vanished on the remote.
    pub prune: bool,
    /// Fetch tags as well.
    pub tags: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            prune: true,
            tags: true,
        }
    }
}

/// Options for [`GitRepo::pull`](crate::GitRepo::pull).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullOptions {
    /// Replay local commits on top of the fetched tip instead of merging.
    pub rebase: bool,
    /// Stash uncommitted changes around the operation.
    pub autostash: bool,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            rebase: true,
            autostash: true,
        }
    }
}

/// How a branch is pushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushMode {
    /// Fast-forward only.
    Plain,
    /// Overwrite only if the remote branch still has the `expected` value
    /// (`None` = the branch must not exist yet).
    Lease {
        /// Value of the remote branch as last observed.
        expected: Option<GitOid>,
    },
    /// Overwrite whatever the remote has.
    Force,
}

/// Result of a push that reached the remote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote accepted the new value.
    Accepted,
    /// The remote refused (non-fast-forward or stale lease).
    Rejected {
        /// Backend message explaining the refusal.
        details: String,
    },
}

impl PushOutcome {
    /// Returns true if the remote took the push.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Result of a history rewrite (rebase or pull --rebase).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Completed without conflicts.
    Clean,
    /// Stopped on a conflict. The rewrite is still in progress and must be
    /// aborted with [`GitRepo::abort_rewrite`](crate::GitRepo::abort_rewrite).
    Conflict,
}

/// How [`GitRepo::reset_to`](crate::GitRepo::reset_to) treats the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetMode {
    /// Keep the index; the discarded diff stays staged.
    Soft,
    /// Reset the index; the discarded diff is left in the working tree only.
    Mixed,
}

/// A multi-step git operation left in progress in the repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingOperation {
    /// `MERGE_HEAD` exists.
    Merge,
    /// `rebase-merge/` or `rebase-apply/` exists.
    Rebase,
    /// `CHERRY_PICK_HEAD` exists.
    CherryPick,
    /// `REVERT_HEAD` exists.
    Revert,
}

impl fmt::Display for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Rebase => write!(f, "rebase"),
            Self::CherryPick => write!(f, "cherry-pick"),
            Self::Revert => write!(f, "revert"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
