//! `sync`: bring Local and its published copy into agreement.

use tracing::instrument;
use trisync_git::PullOptions;

use super::{Engine, SquashRetry};
use crate::classify::classify;
use crate::decision::{ManualResolution, SyncAction, SyncDecision, SyncState, decide_sync};
use crate::error::SyncError;
use crate::events::{EventKind, Op};

impl Engine<'_> {
    /// Fetch, classify Local against its published copy and act on it.
    ///
    /// Being behind Integration only produces a warning here; a branch that
    /// was never published is rebased onto Integration (squash-retry) before
    /// its first push.
    ///
    /// # Errors
    /// Precondition violations (ambiguous base), transport failures, a
    /// refused fast-forward push, a broken prompt channel.
    #[instrument(skip(self), fields(branch = %self.session.names().local))]
    pub fn sync(&mut self) -> Result<SyncDecision, SyncError> {
        self.session.emit(Op::Sync, EventKind::Start, "");
        self.session.fetch()?;

        let triple = self.session.refresh()?;
        let repo = self.session.repo();
        let published = triple
            .local_remote
            .map(|r| classify(repo, triple.local, r))
            .transpose()?;
        let plan = decide_sync(&SyncState {
            base_is_integration: triple.base_is_integration(),
            published,
        });
        tracing::debug!(?plan, ?published, "sync plan");

        let integration = self.session.names().integration.clone();
        if plan.warn_behind {
            self.session.emit(
                Op::Sync,
                EventKind::Warn,
                format!("You are not up to date with {integration}, please rebase later"),
            );
        }

        let decision = match plan.action {
            SyncAction::Publish => {
                self.session
                    .emit(Op::Sync, EventKind::Info, "Publish your branch");
                self.push_plain()?;
                SyncDecision::Push
            }
            SyncAction::RebaseThenPublish => {
                self.session.emit(
                    Op::Sync,
                    EventKind::Info,
                    format!("Rebase onto {integration}, then publish your branch"),
                );
                match self.squash_retry(triple.integration, triple.base)? {
                    SquashRetry::Clean { squashed } => {
                        self.push_plain()?;
                        if squashed {
                            SyncDecision::SquashRetryRebase
                        } else {
                            SyncDecision::Rebase
                        }
                    }
                    SquashRetry::Manual(reason) => SyncDecision::ManualResolutionRequired(reason),
                }
            }
            SyncAction::Push => {
                self.session
                    .emit(Op::Sync, EventKind::Info, "Push your commits");
                self.push_plain()?;
                SyncDecision::Push
            }
            SyncAction::Pull => {
                self.session
                    .emit(Op::Sync, EventKind::Info, "Pull your-origin commits");
                self.pull()?
            }
            SyncAction::Fork => match triple.local_remote {
                Some(local_remote) => self.resolve_fork(triple, local_remote)?,
                None => SyncDecision::Noop,
            },
            SyncAction::Noop => {
                self.session.emit(
                    Op::Sync,
                    EventKind::Info,
                    "your-origin is up to date with your local branch",
                );
                SyncDecision::Noop
            }
        };
        Ok(self.finish(Op::Sync, decision))
    }

    /// Integrate the published copy into Local. A conflict (only possible
    /// when the autostash cannot be re-applied) is aborted.
    fn pull(&mut self) -> Result<SyncDecision, SyncError> {
        let s = &mut self.session;
        s.emit(Op::Pull, EventKind::Start, "");
        let names = s.names().clone();
        let repo = s.repo();
        let outcome = repo.pull(&names.remote, &names.local, PullOptions::default())?;
        if outcome == trisync_git::RewriteOutcome::Conflict {
            if let Some(pending) = repo.pending_operation()? {
                repo.abort_operation(pending)?;
            }
            s.emit(Op::Pull, EventKind::Warn, "Pull FAILED, aborted");
            return Ok(SyncDecision::ManualResolutionRequired(
                ManualResolution::PullConflict,
            ));
        }
        s.emit(Op::Pull, EventKind::End, "");
        Ok(SyncDecision::Pull)
    }
}
