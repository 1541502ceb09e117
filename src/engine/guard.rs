//! The safe force-push guard.

use tracing::{instrument, warn};
use trisync_git::{GitOid, PushMode, PushOutcome};

use super::Engine;
use crate::decision::{OVERWRITE_CHAIN, SyncDecision};
use crate::error::SyncError;
use crate::events::{EventKind, Op};

impl Engine<'_> {
    /// Publish Local over its remote copy.
    ///
    /// The lease push succeeds only if the remote still holds `expected`
    /// (the value this run last observed; `None` = must not exist). A
    /// rejection escalates through [`OVERWRITE_CHAIN`]; only three accepts
    /// in a row reach the unconditional overwrite, any decline cancels with
    /// nothing changed.
    pub(super) fn guarded_push(
        &mut self,
        expected: Option<GitOid>,
    ) -> Result<SyncDecision, SyncError> {
        let s = &mut self.session;
        s.emit(Op::ForcePush, EventKind::Start, "");
        let names = s.names().clone();
        let repo = s.repo();

        let decision = match repo.push(&names.remote, &names.local, PushMode::Lease { expected })? {
            PushOutcome::Accepted => SyncDecision::LeasePush,
            PushOutcome::Rejected { details } => {
                warn!(%details, "lease push rejected");
                s.emit(
                    Op::ForcePush,
                    EventKind::Warn,
                    "Force-Push FAILED, your-origin changed since it was fetched",
                );
                let mut approved = true;
                for prompt in OVERWRITE_CHAIN {
                    if !s.confirm(prompt)? {
                        approved = false;
                        break;
                    }
                }
                if approved {
                    match repo.push(&names.remote, &names.local, PushMode::Force)? {
                        PushOutcome::Accepted => SyncDecision::UnconditionalOverwrite,
                        PushOutcome::Rejected { details } => {
                            return Err(SyncError::PushRejected {
                                branch: names.local.to_string(),
                                details,
                            });
                        }
                    }
                } else {
                    SyncDecision::Cancelled
                }
            }
        };
        Ok(self.finish(Op::ForcePush, decision))
    }

    /// `force-push` on its own: lease against the remote copy as currently
    /// recorded in the remote-tracking ref. Does not fetch, so a push made
    /// by someone else since the last fetch is detected.
    ///
    /// # Errors
    /// Precondition violations, transport failures, a broken prompt channel.
    #[instrument(skip(self))]
    pub fn force_push(&mut self) -> Result<SyncDecision, SyncError> {
        let triple = self.session.refresh()?;
        self.guarded_push(triple.local_remote)
    }
}
