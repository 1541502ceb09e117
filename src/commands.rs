//! Commands that sit beside the reconciliation engine.
//!
//! `commit` and `status` need a [`Session`]. `stash`, `submodule-update` and
//! `abort` only talk to the backend: `abort` in particular has to work while
//! the repository has unmerged paths, which [`Session::open`] refuses.

use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument};
use trisync_git::{GitOid, GitRepo, PendingOperation};

use crate::classify::{Divergence, classify};
use crate::confirm::Confirm;
use crate::decision::Prompt;
use crate::error::SyncError;
use crate::events::{Event, EventKind, EventSink, Op};
use crate::model::Session;

// ---------------------------------------------------------------------------
// commit
// ---------------------------------------------------------------------------

/// Commit everything in the working tree on Local.
///
/// Staged changes are committed as staged; with nothing staged, every change
/// including untracked files is staged first. Returns `None` when there was
/// nothing to commit.
///
/// # Errors
/// Backend failures.
#[instrument(skip(session))]
pub fn commit(session: &mut Session<'_>, message: Option<&str>) -> Result<Option<GitOid>, SyncError> {
    let repo = session.repo();
    if !repo.has_changes()? {
        session.emit(Op::Commit, EventKind::Info, "there are no changes");
        return Ok(None);
    }
    let message = message.map_or_else(|| session.config().commit.message.clone(), str::to_owned);
    session.emit(Op::Commit, EventKind::Start, "");
    session.emit(Op::Commit, EventKind::Info, format!("message: {message}"));
    let oid = repo.commit_all(&message)?;
    session.emit(Op::Commit, EventKind::End, "");
    Ok(oid)
}

// ---------------------------------------------------------------------------
// stash
// ---------------------------------------------------------------------------

/// What [`stash`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StashOutcome {
    Pushed,
    Popped,
    /// The operator said no.
    Cancelled,
    /// Clean tree and no stash entry.
    NothingToDo,
    /// Both a dirty tree and a stash entry, or several entries. Nothing was
    /// touched.
    Refused,
}

/// Toggle between a dirty working tree and a single stash entry.
///
/// # Errors
/// Backend failures, a broken prompt channel.
#[instrument(skip_all)]
pub fn stash(
    repo: &dyn GitRepo,
    confirm: &mut dyn Confirm,
    events: &mut dyn EventSink,
) -> Result<StashOutcome, SyncError> {
    let mut emit = |kind, message: &str| events.emit(Event::new(Op::Stash, kind, message));
    emit(EventKind::Start, "");

    let entries = repo.stash_count()?;
    let dirty = repo.has_changes()?;
    debug!(entries, dirty, "stash state");

    let outcome = match (dirty, entries) {
        (_, n) if n > 1 => {
            emit(
                EventKind::Fail,
                "more than one stash entry, clean up with `git stash list` and `git stash drop`",
            );
            StashOutcome::Refused
        }
        (true, 1) => {
            emit(
                EventKind::Fail,
                "you have both local changes and a stash entry, run `git stash drop` first",
            );
            StashOutcome::Refused
        }
        (true, _) => {
            if confirm.confirm(Prompt::StashPush).map_err(SyncError::Prompt)? {
                repo.stash_push()?;
                StashOutcome::Pushed
            } else {
                emit(EventKind::Info, "CANCELLED");
                StashOutcome::Cancelled
            }
        }
        (false, 1) => {
            if confirm.confirm(Prompt::StashPop).map_err(SyncError::Prompt)? {
                repo.stash_pop()?;
                StashOutcome::Popped
            } else {
                emit(EventKind::Info, "CANCELLED");
                StashOutcome::Cancelled
            }
        }
        (false, _) => {
            emit(EventKind::Info, "nothing to stash or pop");
            StashOutcome::NothingToDo
        }
    };
    emit(EventKind::End, "");
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// submodule-update
// ---------------------------------------------------------------------------

/// `git submodule update --init --recursive --force`, with `--remote` when
/// `remote_latest` is set.
///
/// # Errors
/// Backend failures.
pub fn submodule_update(
    repo: &dyn GitRepo,
    events: &mut dyn EventSink,
    remote_latest: bool,
) -> Result<(), SyncError> {
    events.emit(Event::new(Op::Submodule, EventKind::Start, ""));
    repo.submodule_update(remote_latest)?;
    events.emit(Event::new(Op::Submodule, EventKind::End, ""));
    Ok(())
}

// ---------------------------------------------------------------------------
// abort
// ---------------------------------------------------------------------------

/// Abort whatever multi-step operation is in progress. Returns the aborted
/// operation, or `None` when the repository was idle.
///
/// # Errors
/// Backend failures, including a failed abort.
pub fn abort(
    repo: &dyn GitRepo,
    events: &mut dyn EventSink,
) -> Result<Option<PendingOperation>, SyncError> {
    let Some(pending) = repo.pending_operation()? else {
        events.emit(Event::new(Op::Abort, EventKind::Info, "no operation in progress"));
        return Ok(None);
    };
    events.emit(Event::new(Op::Abort, EventKind::Start, format!("aborting {pending}")));
    if let Err(e) = repo.abort_operation(pending) {
        events.emit(Event::new(
            Op::Abort,
            EventKind::Fail,
            format!("{pending} abort FAILED, please find help"),
        ));
        return Err(e.into());
    }
    events.emit(Event::new(Op::Abort, EventKind::End, ""));
    Ok(Some(pending))
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

/// Read-only view of the triple and its divergences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub branch: String,
    pub remote: String,
    pub integration: String,
    pub local: String,
    pub local_remote: Option<String>,
    pub integration_tip: String,
    pub base: String,
    /// Local against its published copy; absent until first published.
    pub published: Option<Divergence>,
    /// Local against Integration.
    pub upstream: Divergence,
    pub dirty: bool,
    pub pending_operation: Option<String>,
}

/// Collect a [`StatusReport`]. Nothing is mutated; the remote is fetched only
/// when `fetch` is set, and then without emitting events so JSON output stays
/// clean.
///
/// # Errors
/// Precondition violations and backend failures.
#[instrument(skip(session))]
pub fn status(session: &Session<'_>, fetch: bool) -> Result<StatusReport, SyncError> {
    let repo = session.repo();
    let names = session.names();
    if fetch {
        repo.fetch(&names.remote, session.config().fetch.options())?;
    }
    let triple = session.refresh()?;
    let published = triple
        .local_remote
        .map(|r| classify(repo, triple.local, r))
        .transpose()?;
    let upstream = classify(repo, triple.local, triple.integration)?;

    Ok(StatusReport {
        branch: names.local.to_string(),
        remote: names.remote.clone(),
        integration: names.integration.to_string(),
        local: triple.local.to_string(),
        local_remote: triple.local_remote.map(|o| o.to_string()),
        integration_tip: triple.integration.to_string(),
        base: triple.base.to_string(),
        published,
        upstream,
        dirty: repo.has_changes()?,
        pending_operation: repo.pending_operation()?.map(|p| p.to_string()),
    })
}

fn short(hex: &str) -> &str {
    hex.get(..8).unwrap_or(hex)
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "branch       {}  {}", self.branch, short(&self.local))?;
        match (&self.local_remote, self.published) {
            (Some(oid), Some(d)) => writeln!(
                f,
                "your-origin  {}/{}  {}  (ahead {}, behind {})",
                self.remote,
                self.branch,
                short(oid),
                d.ahead,
                d.behind
            )?,
            _ => writeln!(f, "your-origin  not published")?,
        }
        writeln!(
            f,
            "integration  {}/{}  {}  (ahead {}, behind {})",
            self.remote,
            self.integration,
            short(&self.integration_tip),
            self.upstream.ahead,
            self.upstream.behind
        )?;
        writeln!(f, "base         {}", short(&self.base))?;
        if self.dirty {
            writeln!(f, "working tree has uncommitted changes")?;
        }
        if let Some(op) = &self.pending_operation {
            writeln!(f, "{op} in progress, run `trisync abort` to cancel it")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// zen
// ---------------------------------------------------------------------------

/// The maxims, followed by a small picture of a linear history.
pub const ZEN: &[&str] = &[
    "Always keep the tree structure, linear history",
    "A commit doesn't matter, the total amount of commits matters",
    "Only three branches, yours, your origin, master",
    "Be responsible for your own branch",
    "         ",
    "    |    ",
    "    ●    ",
    " |  |    ",
    " ●  ●    ",
    "  \\ |  | ",
    "    ●  ● ",
    "    | /  ",
    "    ●    ",
    "    |    ",
    "         ",
];
