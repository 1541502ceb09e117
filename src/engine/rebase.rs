//! `rebase`: sync, then move Local onto the current Integration tip.

use tracing::instrument;

use super::{Engine, SquashRetry};
use crate::decision::SyncDecision;
use crate::error::SyncError;
use crate::events::{EventKind, Op};

impl Engine<'_> {
    /// Run [`sync`](Self::sync); unless it stopped, rebase Local onto
    /// Integration (with the squash fallback) and republish through the
    /// force-push guard, since Local's published history was rewritten.
    ///
    /// # Errors
    /// See [`sync`](Self::sync) and [`squash_retry`](Self::squash_retry).
    #[instrument(skip(self))]
    pub fn rebase(&mut self) -> Result<SyncDecision, SyncError> {
        let synced = self.sync()?;
        if matches!(
            synced,
            SyncDecision::Cancelled | SyncDecision::ManualResolutionRequired(_)
        ) {
            self.session.emit(Op::Rebase, EventKind::Info, "CANCELLED");
            return Ok(synced);
        }

        let triple = self.session.refresh()?;
        if triple.base_is_integration() {
            let integration = self.session.names().integration.clone();
            self.session.emit(
                Op::Rebase,
                EventKind::Info,
                format!("Already up to date with {integration}"),
            );
            // sync may already have rebased and published; report that.
            return Ok(synced);
        }

        let squashed = match self.squash_retry(triple.integration, triple.base)? {
            SquashRetry::Manual(reason) => {
                return Ok(self.finish(Op::Rebase, SyncDecision::ManualResolutionRequired(reason)));
            }
            SquashRetry::Clean { squashed } => squashed,
        };

        let after = self.session.refresh()?;
        let decision = match self.guarded_push(after.local_remote)? {
            SyncDecision::Cancelled => SyncDecision::Cancelled,
            _ if squashed => SyncDecision::SquashRetryRebase,
            _ => SyncDecision::Rebase,
        };
        Ok(decision)
    }
}
