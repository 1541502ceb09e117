//! `reset` and `reset --mine`.

use tracing::{debug, instrument};
use trisync_git::{CommitInfo, GitOid, ResetMode};

use super::Engine;
use crate::decision::{Prompt, SyncDecision};
use crate::error::SyncError;
use crate::events::{EventKind, Op};

impl Engine<'_> {
    /// Move Local back to Base, leaving its changes unstaged in the working
    /// tree. Returns the new tip. Publishing the result needs a force-push.
    ///
    /// # Errors
    /// Backend failures.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> Result<GitOid, SyncError> {
        let triple = self.session.refresh()?;
        self.session.emit(Op::Reset, EventKind::Start, "");
        self.session.repo().reset_to(triple.base, ResetMode::Mixed)?;
        self.session.emit(
            Op::Reset,
            EventKind::Warn,
            "You need to force-push later",
        );
        self.session.emit(Op::Reset, EventKind::End, "");
        Ok(triple.base)
    }

    /// The newest Integration commit committed after Base whose author
    /// email matches the operator's, i.e. the operator's own merged work.
    ///
    /// # Errors
    /// Backend failures.
    pub fn find_my_merge(&self) -> Result<Option<CommitInfo>, SyncError> {
        let (_, email) = self.session.identity()?;
        if email.is_empty() {
            return Ok(None);
        }
        let email = email.to_lowercase();
        let repo = self.session.repo();
        let triple = self.session.refresh()?;
        let base_time = repo.read_commit(triple.base)?.commit_time;

        for oid in repo.commits_between(triple.base, triple.integration)? {
            let info = repo.read_commit(oid)?;
            if info.commit_time <= base_time {
                break;
            }
            if info.author_email.to_lowercase().contains(&email) {
                return Ok(Some(info));
            }
        }
        Ok(None)
    }

    /// `reset --mine`: after the operator's branch was merged upstream, move
    /// Local to that merge on Integration and republish.
    ///
    /// # Errors
    /// Backend failures, a broken prompt channel.
    #[instrument(skip(self))]
    pub fn reset_to_mine(&mut self) -> Result<SyncDecision, SyncError> {
        let Some(mine) = self.find_my_merge()? else {
            self.session.emit(
                Op::Reset,
                EventKind::Info,
                "no commit of yours on the integration branch since your base",
            );
            return Ok(SyncDecision::Noop);
        };
        debug!(oid = %mine.oid, "found own merge");
        self.session.emit(Op::Reset, EventKind::Start, mine.to_string());
        if !self.session.confirm(Prompt::ResetToMine)? {
            return Ok(self.finish(Op::Reset, SyncDecision::Cancelled));
        }
        self.session.repo().reset_to(mine.oid, ResetMode::Mixed)?;
        self.session.emit(Op::Reset, EventKind::End, "");
        let triple = self.session.refresh()?;
        self.guarded_push(triple.local_remote)
    }
}
