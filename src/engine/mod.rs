//! The executing half of the engine.
//!
//! [`Engine`] runs the paths chosen by [`crate::decision`] against the
//! session's backend, asking confirmations and emitting events on the way.
//! Every public operation returns the run's [`SyncDecision`]; an `Err` is
//! reserved for precondition violations and backend failures.
//!
//! | Operation              | Module       |
//! |------------------------|--------------|
//! | [`Engine::sync`]       | [`sync`]     |
//! | fork resolution        | [`fork`]     |
//! | squash-retry, [`Engine::squash`] | [`squash`] |
//! | [`Engine::force_push`] | [`guard`]    |
//! | [`Engine::rebase`]     | [`rebase`]   |
//! | [`Engine::reset`], [`Engine::reset_to_mine`] | [`reset`] |

mod fork;
mod guard;
mod rebase;
mod reset;
mod squash;
mod sync;


use trisync_git::PushMode;

use crate::decision::SyncDecision;
use crate::error::SyncError;
use crate::events::{EventKind, Op};
use crate::model::Session;

pub use squash::SquashRetry;

/// Runs reconciliation operations for one session.
pub struct Engine<'a> {
    session: Session<'a>,
}

impl<'a> Engine<'a> {
    #[must_use]
    pub const fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub const fn session(&mut self) -> &mut Session<'a> {
        &mut self.session
    }

    #[must_use]
    pub fn into_session(self) -> Session<'a> {
        self.session
    }

    /// Fast-forward push of Local (or first publication).
    fn push_plain(&mut self) -> Result<(), SyncError> {
        let s = &mut self.session;
        s.emit(Op::Push, EventKind::Start, "");
        let names = s.names().clone();
        let outcome = s.repo().push(&names.remote, &names.local, PushMode::Plain)?;
        if let trisync_git::PushOutcome::Rejected { details } = outcome {
            s.emit(Op::Push, EventKind::Fail, "remote refused the push");
            return Err(SyncError::PushRejected {
                branch: names.local.to_string(),
                details,
            });
        }
        s.emit(Op::Push, EventKind::End, "");
        Ok(())
    }

    fn finish(&mut self, op: Op, decision: SyncDecision) -> SyncDecision {
        match decision {
            SyncDecision::Cancelled => self.session.emit(op, EventKind::Info, "CANCELLED"),
            SyncDecision::ManualResolutionRequired(reason) => {
                self.session.emit(op, EventKind::Fail, reason.to_string());
            }
            _ => {}
        }
        self.session.emit(op, EventKind::End, "");
        decision
    }
}
