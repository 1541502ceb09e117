//! Fork resolution: Local and its published copy both have new commits.

use tracing::debug;
use trisync_git::GitOid;

use super::{Engine, SquashRetry};
use crate::decision::{ForkAction, ForkPlan, Prompt, SyncDecision, fork_plan, resolve_fork};
use crate::error::SyncError;
use crate::events::{EventKind, Op};
use crate::model::BranchTriple;

impl Engine<'_> {
    /// Decide which side of a fork wins and carry it out.
    ///
    /// When Base is strictly newer than the published copy's own base on
    /// Integration, Local has already absorbed a later Integration and wins
    /// without the side-selection prompt. Otherwise the operator picks.
    pub(super) fn resolve_fork(
        &mut self,
        triple: BranchTriple,
        local_remote: GitOid,
    ) -> Result<SyncDecision, SyncError> {
        self.session.emit(
            Op::Fork,
            EventKind::Warn,
            "Found fork: your-origin and your branch both have new commits",
        );
        let repo = self.session.repo();
        let remote_base = repo.merge_base(local_remote, triple.integration)?;
        let base_time = repo.read_commit(triple.base)?.author_time;
        let remote_base_time = repo.read_commit(remote_base)?.author_time;
        debug!(base_time, remote_base_time, "comparing fork bases");

        let action = match fork_plan(base_time > remote_base_time) {
            ForkPlan::Overwrite => {
                self.session.emit(
                    Op::Fork,
                    EventKind::Info,
                    "your branch is based on a newer integration state, overwriting your-origin",
                );
                ForkAction::KeepLocal
            }
            ForkPlan::Ask(_) => {
                let keep_remote = self.session.confirm(Prompt::KeepRemote)?;
                let keep_local = !keep_remote && self.session.confirm(Prompt::KeepLocal)?;
                resolve_fork(keep_remote, keep_local)
            }
        };

        match action {
            ForkAction::KeepLocal => self.guarded_push(Some(local_remote)),
            ForkAction::KeepRemote => self.adopt_remote(triple, local_remote),
            ForkAction::Cancel => Ok(SyncDecision::Cancelled),
        }
    }

    /// Rebase Local onto its published copy, then push if anything is left
    /// to publish.
    fn adopt_remote(
        &mut self,
        triple: BranchTriple,
        local_remote: GitOid,
    ) -> Result<SyncDecision, SyncError> {
        let base = self.session.repo().merge_base(triple.local, local_remote)?;
        match self.squash_retry(local_remote, base)? {
            SquashRetry::Manual(reason) => Ok(SyncDecision::ManualResolutionRequired(reason)),
            SquashRetry::Clean { squashed } => {
                let after = self.session.refresh()?;
                if after.local != local_remote {
                    self.push_plain()?;
                }
                Ok(if squashed {
                    SyncDecision::SquashRetryRebase
                } else {
                    SyncDecision::Rebase
                })
            }
        }
    }
}
