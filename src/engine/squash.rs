//! Squash-retry fallback and the `squash` command.

use tracing::{debug, instrument};
use trisync_git::{GitOid, ResetMode, RewriteOutcome};

use super::Engine;
use crate::decision::{ManualResolution, Prompt, SyncDecision};
use crate::error::{Precondition, SyncError};
use crate::events::{EventKind, Op};

/// Result of [`Engine::squash_retry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SquashRetry {
    /// Local now sits on top of the target. `squashed` tells whether it took
    /// the fallback.
    Clean { squashed: bool },
    /// Stopped; see the reason for where Local was left.
    Manual(ManualResolution),
}

impl Engine<'_> {
    /// Rebase Local onto `target`; on conflict abort, offer to squash
    /// everything since `base` into one commit, and retry exactly once.
    ///
    /// Local is either rebased, untouched (first conflict, squash declined),
    /// or left at the squash commit (second conflict). No commit's changes
    /// are lost: the squash commit carries the tree of the old tip.
    ///
    /// # Errors
    /// Backend failures, a broken prompt channel, or staged changes when
    /// the squash step is reached.
    #[instrument(skip(self), fields(target = %target.short(), base = %base.short()))]
    pub fn squash_retry(&mut self, target: GitOid, base: GitOid) -> Result<SquashRetry, SyncError> {
        let repo = self.session.repo();
        let local = self.session.refresh()?.local;
        self.session
            .emit(Op::Rebase, EventKind::Start, format!("onto {}", target.short()));

        if repo.would_conflict(local, target)? {
            self.session.emit(
                Op::Rebase,
                EventKind::Warn,
                "a conflict is expected, trying anyway",
            );
        }
        if self.rewrite_once(target)? {
            self.session.emit(Op::Rebase, EventKind::End, "");
            return Ok(SquashRetry::Clean { squashed: false });
        }

        // The soft reset keeps the old tip in the index; staged edits would
        // be folded into the squash commit. Unstaged ones ride the autostash.
        if repo.has_staged_changes()? {
            return Err(Precondition::DirtyWorkingTree.into());
        }
        if !self.session.confirm(Prompt::SquashAndRetry)? {
            self.session.emit(Op::Rebase, EventKind::Info, "CANCELLED");
            return Ok(SquashRetry::Manual(ManualResolution::SquashDeclined));
        }

        let message = self.session.config().commit.rebase_squash_message.clone();
        self.squash_onto(base, ResetMode::Soft, &message)?;
        if self.rewrite_once(target)? {
            self.session.emit(Op::Rebase, EventKind::End, "");
            return Ok(SquashRetry::Clean { squashed: true });
        }
        self.session.emit(
            Op::Rebase,
            EventKind::Fail,
            "Please resolve the conflict manually, then sync",
        );
        Ok(SquashRetry::Manual(ManualResolution::ConflictAfterSquash))
    }

    /// One rebase attempt. A conflict is aborted, restoring Local and the
    /// working tree. Returns whether it went through.
    fn rewrite_once(&mut self, target: GitOid) -> Result<bool, SyncError> {
        let repo = self.session.repo();
        match repo.rewrite_onto(target, true)? {
            RewriteOutcome::Clean => Ok(true),
            RewriteOutcome::Conflict => {
                repo.abort_rewrite()?;
                self.session
                    .emit(Op::Rebase, EventKind::Warn, "Rebase FAILED, aborted");
                Ok(false)
            }
        }
    }

    /// Collapse every commit since `base` into one.
    fn squash_onto(
        &mut self,
        base: GitOid,
        mode: ResetMode,
        message: &str,
    ) -> Result<Option<GitOid>, SyncError> {
        let repo = self.session.repo();
        self.session.emit(
            Op::Squash,
            EventKind::Start,
            format!("your base is {}", base.short()),
        );
        repo.reset_to(base, mode)?;
        let commit = repo.commit_all(message)?;
        debug!(?commit, "squashed");
        self.session.emit(Op::Squash, EventKind::End, "");
        Ok(commit)
    }

    /// `squash`: collapse Local's commits since Base into one commit and
    /// publish it through the force-push guard.
    ///
    /// # Errors
    /// Uncommitted changes (including untracked files), backend failures,
    /// a broken prompt channel.
    #[instrument(skip(self))]
    pub fn squash(&mut self, message: Option<&str>) -> Result<SyncDecision, SyncError> {
        let repo = self.session.repo();
        if repo.has_changes()? {
            return Err(Precondition::DirtyWorkingTree.into());
        }
        let triple = self.session.refresh()?;
        if repo.commits_between(triple.base, triple.local)?.len() < 2 {
            self.session
                .emit(Op::Squash, EventKind::Info, "nothing to squash");
            return Ok(SyncDecision::Noop);
        }
        let message = message.map_or_else(
            || self.session.config().commit.squash_message.clone(),
            str::to_owned,
        );
        self.squash_onto(triple.base, ResetMode::Mixed, &message)?;
        self.guarded_push(triple.local_remote)
    }
}
