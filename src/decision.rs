//! The pure half of the engine.
//!
//! Nothing here touches a repository or asks a question. Given the observed
//! state, these functions say which path a run takes and which confirmations
//! that path may need; the executors in [`crate::engine`] carry it out.

use std::fmt;

use serde::Serialize;

use crate::classify::{Divergence, DivergenceKind};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a run stopped and handed control back to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManualResolution {
    /// The rebase conflicted and the operator declined to squash. Local is
    /// unchanged.
    SquashDeclined,
    /// The rebase conflicted again after squashing. Local is left at the
    /// squash commit.
    ConflictAfterSquash,
    /// Pulling the published branch conflicted and was aborted.
    PullConflict,
}

impl fmt::Display for ManualResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SquashDeclined => {
                "rebase conflicts and squashing was declined; rebase by hand, then sync"
            }
            Self::ConflictAfterSquash => {
                "rebase still conflicts after squashing; resolve the conflict by hand, then sync"
            }
            Self::PullConflict => {
                "pulling your published branch conflicts; integrate it by hand, then sync"
            }
        })
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "decision", content = "reason")]
pub enum SyncDecision {
    /// Nothing to do.
    Noop,
    /// Local was pushed as a fast-forward (or first publication).
    Push,
    /// The published branch was pulled into Local.
    Pull,
    /// Local was rebased cleanly (and published).
    Rebase,
    /// Local was squashed into one commit, then rebased (and published).
    SquashRetryRebase,
    /// Local was published over a diverged remote copy with a lease.
    LeasePush,
    /// Local was published with an unconditional overwrite after the
    /// operator confirmed it three times.
    UnconditionalOverwrite,
    /// The operator declined; nothing changed.
    Cancelled,
    /// The run stopped; the operator must finish by hand.
    ManualResolutionRequired(ManualResolution),
}

impl SyncDecision {
    /// Whether the run ended in a state the operator has to act on.
    #[must_use]
    pub const fn needs_manual_resolution(self) -> bool {
        matches!(self, Self::ManualResolutionRequired(_))
    }
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Noop => f.write_str("nothing to do"),
            Self::Push => f.write_str("pushed"),
            Self::Pull => f.write_str("pulled"),
            Self::Rebase => f.write_str("rebased"),
            Self::SquashRetryRebase => f.write_str("squashed and rebased"),
            Self::LeasePush => f.write_str("force-pushed with lease"),
            Self::UnconditionalOverwrite => f.write_str("overwrote the remote branch"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::ManualResolutionRequired(reason) => write!(f, "manual resolution required: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Every question the engine and commands can ask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prompt {
    /// The rebase conflicted; squash Local and retry once?
    SquashAndRetry,
    /// Fork: drop Local's divergent commits in favour of the remote copy?
    KeepRemote,
    /// Fork: overwrite the remote copy with Local?
    KeepLocal,
    /// Lease rejected, first of three.
    OverwriteOthers,
    /// Lease rejected, second of three.
    TheirWorkMayMatter,
    /// Lease rejected, last of three.
    AreYouSure,
    /// `reset --mine`: is the shown commit the operator's latest merge?
    ResetToMine,
    /// `stash`: stash the dirty tree?
    StashPush,
    /// `stash`: pop the only stash entry?
    StashPop,
}

/// The escalation chain before an unconditional overwrite, in order.
pub const OVERWRITE_CHAIN: [Prompt; 3] = [
    Prompt::OverwriteOthers,
    Prompt::TheirWorkMayMatter,
    Prompt::AreYouSure,
];

impl Prompt {
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::SquashAndRetry => "Found conflict. Squash and try again?",
            Self::KeepRemote => "Keep your-origin code?",
            Self::KeepLocal => "Keep your code?",
            Self::OverwriteOthers => "Someone committed into your-origin, OVERWRITE their code?",
            Self::TheirWorkMayMatter => "Their code may be useful, continue?",
            Self::AreYouSure => "Are you sure?",
            Self::ResetToMine => "Is this your latest merge request?",
            Self::StashPush => "Do you want to stash your changes?",
            Self::StashPop => "Do you want to pop the stash?",
        }
    }

    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::SquashAndRetry | Self::KeepRemote | Self::KeepLocal => "🚨",
            Self::OverwriteOthers | Self::TheirWorkMayMatter | Self::AreYouSure => "⏫",
            Self::ResetToMine => "🪓",
            Self::StashPush | Self::StashPop => "📁",
        }
    }
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

/// What the decision needs to know about the branch triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncState {
    /// Base equals the integration tip.
    pub base_is_integration: bool,
    /// `classify(local, local_remote)`, or `None` when Local was never
    /// published.
    pub published: Option<Divergence>,
}

/// The branch `sync` takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncAction {
    /// First publication, no rewrite needed.
    Publish,
    /// First publication of a branch that is behind integration: rebase
    /// (with squash fallback) first.
    RebaseThenPublish,
    /// Local is strictly ahead of its remote copy.
    Push,
    /// The remote copy is strictly ahead of Local.
    Pull,
    /// Both sides have commits the other lacks.
    Fork,
    /// Identical.
    Noop,
}

/// Result of [`decide_sync`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncPlan {
    /// Warn that Local is behind integration (does not block).
    pub warn_behind: bool,
    pub action: SyncAction,
}

impl SyncPlan {
    /// Every confirmation this path may ask, in the order it would ask them.
    /// Which ones are actually asked depends on backend results (conflicts,
    /// lease rejections, earlier answers).
    #[must_use]
    pub fn required_prompts(&self) -> Vec<Prompt> {
        match self.action {
            SyncAction::Publish | SyncAction::Push | SyncAction::Pull | SyncAction::Noop => {
                Vec::new()
            }
            SyncAction::RebaseThenPublish => vec![Prompt::SquashAndRetry],
            SyncAction::Fork => {
                let mut prompts = vec![Prompt::KeepRemote, Prompt::SquashAndRetry, Prompt::KeepLocal];
                prompts.extend(OVERWRITE_CHAIN);
                prompts
            }
        }
    }
}

/// Choose the `sync` path.
#[must_use]
pub const fn decide_sync(state: &SyncState) -> SyncPlan {
    let warn_behind = !state.base_is_integration;
    let action = match state.published {
        None if state.base_is_integration => SyncAction::Publish,
        None => SyncAction::RebaseThenPublish,
        Some(d) => match d.kind() {
            DivergenceKind::Ahead => SyncAction::Push,
            DivergenceKind::Behind => SyncAction::Pull,
            DivergenceKind::Forked => SyncAction::Fork,
            DivergenceKind::Identical => SyncAction::Noop,
        },
    };
    SyncPlan {
        warn_behind,
        action,
    }
}

// ---------------------------------------------------------------------------
// Fork resolution
// ---------------------------------------------------------------------------

/// How a fork is settled before asking anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForkPlan {
    /// Local already contains a later integration state than the remote
    /// copy: publish Local without the side-selection prompt.
    Overwrite,
    /// Ask the operator, in this order.
    Ask(Vec<Prompt>),
}

/// `base_newer`: Base's authoring time is strictly later than that of
/// `merge_base(local_remote, integration)`.
#[must_use]
pub fn fork_plan(base_newer: bool) -> ForkPlan {
    if base_newer {
        ForkPlan::Overwrite
    } else {
        ForkPlan::Ask(vec![Prompt::KeepRemote, Prompt::KeepLocal])
    }
}

/// The side the operator picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForkAction {
    /// Rebase Local onto the remote copy.
    KeepRemote,
    /// Publish Local over the remote copy.
    KeepLocal,
    Cancel,
}

/// Map the answers to the fork prompts to an action. `keep_local` is only
/// consulted when `keep_remote` was declined.
#[must_use]
pub const fn resolve_fork(keep_remote: bool, keep_local: bool) -> ForkAction {
    if keep_remote {
        ForkAction::KeepRemote
    } else if keep_local {
        ForkAction::KeepLocal
    } else {
        ForkAction::Cancel
    }
}
