//! The branch triple and the per-run session.
//!
//! A run reasons about three pointers:
//!
//! - **Local**: the checked-out feature branch (`refs/heads/<b>`).
//! - **LocalRemote**: the operator's published copy
//!   (`refs/remotes/<remote>/<b>`), absent until first published.
//! - **Integration**: the shared trunk (`refs/remotes/<remote>/<main>`).
//!
//! plus **Base**, the unique merge base of Local and Integration. All four are
//! read from the backend by [`BranchTriple::load`]; nothing is cached across
//! runs, and [`Session::refresh`] reloads after every mutation.

use tracing::{debug, instrument};
use trisync_git::{BranchName, CommitInfo, GitError, GitOid, GitRepo};

use crate::config::TrisyncConfig;
use crate::confirm::Confirm;
use crate::decision::Prompt;
use crate::error::{Precondition, SyncError};
use crate::events::{Event, EventKind, EventSink, Op};

/// Branch and remote names of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Names {
    pub remote: String,
    pub local: BranchName,
    pub integration: BranchName,
}

impl Names {
    #[must_use]
    pub fn local_ref(&self) -> String {
        self.local.local_ref()
    }

    #[must_use]
    pub fn local_remote_ref(&self) -> String {
        self.local.tracking_ref(&self.remote)
    }

    #[must_use]
    pub fn integration_ref(&self) -> String {
        self.integration.tracking_ref(&self.remote)
    }
}

/// A snapshot of the three pointers and their base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchTriple {
    pub local: GitOid,
    pub local_remote: Option<GitOid>,
    pub integration: GitOid,
    pub base: GitOid,
}

impl BranchTriple {
    /// Read every pointer and compute Base.
    ///
    /// # Errors
    /// A missing Local or Integration ref, and an absent or ambiguous merge
    /// base (as [`Precondition`]s).
    pub fn load(repo: &dyn GitRepo, names: &Names) -> Result<Self, SyncError> {
        let local = repo
            .resolve_ref(&names.local_ref())?
            .ok_or_else(|| GitError::NotFound {
                message: format!("branch '{}' has no commits", names.local),
            })?;
        let integration = repo.resolve_ref(&names.integration_ref())?.ok_or_else(|| {
            Precondition::NoIntegrationBranch {
                remote: names.remote.clone(),
                candidates: names.integration.to_string(),
            }
        })?;
        let local_remote = repo.resolve_ref(&names.local_remote_ref())?;
        let base = repo.merge_base(local, integration)?;
        Ok(Self {
            local,
            local_remote,
            integration,
            base,
        })
    }

    /// Local contains the integration tip.
    #[must_use]
    pub fn base_is_integration(&self) -> bool {
        self.base == self.integration
    }
}

/// Everything one run needs, passed explicitly instead of living in globals.
pub struct Session<'a> {
    repo: &'a dyn GitRepo,
    names: Names,
    config: TrisyncConfig,
    confirm: &'a mut dyn Confirm,
    events: &'a mut dyn EventSink,
}

impl<'a> Session<'a> {
    /// Check the startup preconditions and resolve the branch names.
    ///
    /// The integration branch is the first of `config.remote.integration`
    /// with a remote-tracking ref.
    ///
    /// # Errors
    /// Any violated [`Precondition`], or a backend failure.
    #[instrument(skip_all, fields(remote = %config.remote.name))]
    pub fn open(
        repo: &'a dyn GitRepo,
        config: TrisyncConfig,
        confirm: &'a mut dyn Confirm,
        events: &'a mut dyn EventSink,
    ) -> Result<Self, SyncError> {
        if repo.has_unmerged_paths()? {
            return Err(Precondition::UnmergedPaths.into());
        }
        let remote = config.remote.name.clone();
        if !repo.has_remote(&remote)? {
            return Err(Precondition::NoRemote { remote }.into());
        }
        let local = repo.current_branch()?.ok_or(Precondition::DetachedHead)?;

        let mut integration = None;
        for candidate in &config.remote.integration {
            let Ok(name) = BranchName::new(candidate) else {
                continue;
            };
            if repo.resolve_ref(&name.tracking_ref(&remote))?.is_some() {
                integration = Some(name);
                break;
            }
        }
        let integration = integration.ok_or_else(|| Precondition::NoIntegrationBranch {
            remote: remote.clone(),
            candidates: config.remote.integration.join(", "),
        })?;
        if local == integration {
            return Err(Precondition::OnIntegrationBranch {
                branch: integration.to_string(),
            }
            .into());
        }

        debug!(local = %local, integration = %integration, "session opened");
        Ok(Self {
            repo,
            names: Names {
                remote,
                local,
                integration,
            },
            config,
            confirm,
            events,
        })
    }

    #[must_use]
    pub fn repo(&self) -> &'a dyn GitRepo {
        self.repo
    }

    #[must_use]
    pub const fn names(&self) -> &Names {
        &self.names
    }

    #[must_use]
    pub const fn config(&self) -> &TrisyncConfig {
        &self.config
    }

    /// Re-read the triple. Called after every operation that may move a
    /// pointer.
    ///
    /// # Errors
    /// See [`BranchTriple::load`].
    pub fn refresh(&self) -> Result<BranchTriple, SyncError> {
        let triple = BranchTriple::load(self.repo, &self.names)?;
        debug!(
            local = %triple.local.short(),
            local_remote = ?triple.local_remote.map(|o| o.short()),
            integration = %triple.integration.short(),
            base = %triple.base.short(),
            "triple refreshed"
        );
        Ok(triple)
    }

    /// Fetch the remote with the configured options.
    ///
    /// # Errors
    /// Transport failures, unchanged.
    pub fn fetch(&mut self) -> Result<(), SyncError> {
        self.emit(Op::Fetch, EventKind::Start, "");
        self.repo
            .fetch(&self.names.remote, self.config.fetch.options())?;
        self.emit(Op::Fetch, EventKind::End, "");
        Ok(())
    }

    pub fn emit(&mut self, op: Op, kind: EventKind, message: impl Into<String>) {
        self.events.emit(Event::new(op, kind, message));
    }

    /// Ask the operator.
    ///
    /// # Errors
    /// The confirmation channel failed.
    pub fn confirm(&mut self, prompt: Prompt) -> Result<bool, SyncError> {
        self.confirm.confirm(prompt).map_err(SyncError::Prompt)
    }

    /// The operator's `(name, email)` from git config.
    ///
    /// # Errors
    /// Backend failures; unset values come back empty.
    pub fn identity(&self) -> Result<(String, String), SyncError> {
        let name = self.repo.read_config("user.name")?.unwrap_or_default();
        let email = self.repo.read_config("user.email")?.unwrap_or_default();
        Ok((name, email))
    }

    /// Metadata for an operator-facing message.
    ///
    /// # Errors
    /// Backend failures.
    pub fn describe(&self, oid: GitOid) -> Result<CommitInfo, SyncError> {
        Ok(self.repo.read_commit(oid)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::Scripted;
    use crate::events::Recorder;
    use trisync_git::MemoryRepo;

    fn open<'a>(
        repo: &'a MemoryRepo,
        confirm: &'a mut Scripted,
        events: &'a mut Recorder,
    ) -> Result<Session<'a>, SyncError> {
        Session::open(repo, TrisyncConfig::default(), confirm, events)
    }

    #[test]
    fn resolves_names_and_triple() {
        let repo = MemoryRepo::new("feature", "main");
        let (mut c, mut e) = (Scripted::default(), Recorder::default());
        let session = open(&repo, &mut c, &mut e).unwrap();
        assert_eq!(session.names().local.as_str(), "feature");
        assert_eq!(session.names().integration.as_str(), "main");
        let triple = session.refresh().unwrap();
        assert_eq!(triple.local_remote, None);
        assert!(triple.base_is_integration());
    }

    #[test]
    fn master_is_preferred_over_main() {
        let repo = MemoryRepo::new("feature", "main");
        let main = repo.tracking_tip("main").unwrap();
        repo.set_remote_branch("master", main);
        repo.fetch("origin", trisync_git::FetchOptions::default()).unwrap();
        let (mut c, mut e) = (Scripted::default(), Recorder::default());
        let session = open(&repo, &mut c, &mut e).unwrap();
        assert_eq!(session.names().integration.as_str(), "master");
    }

    #[test]
    fn unmerged_paths_block_startup() {
        let repo = MemoryRepo::new("feature", "main");
        repo.set_unmerged(true);
        let (mut c, mut e) = (Scripted::default(), Recorder::default());
        assert!(matches!(
            open(&repo, &mut c, &mut e),
            Err(SyncError::Precondition(Precondition::UnmergedPaths))
        ));
    }

    #[test]
    fn unknown_remote_blocks_startup() {
        let repo = MemoryRepo::new("feature", "main");
        let mut config = TrisyncConfig::default();
        config.remote.name = "upstream".to_owned();
        let (mut c, mut e) = (Scripted::default(), Recorder::default());
        assert!(matches!(
            Session::open(&repo, config, &mut c, &mut e),
            Err(SyncError::Precondition(Precondition::NoRemote { .. }))
        ));
    }

    #[test]
    fn missing_integration_branch_blocks_startup() {
        let repo = MemoryRepo::new("feature", "trunk");
        let (mut c, mut e) = (Scripted::default(), Recorder::default());
        assert!(matches!(
            open(&repo, &mut c, &mut e),
            Err(SyncError::Precondition(Precondition::NoIntegrationBranch { .. }))
        ));
    }

    #[test]
    fn detached_head_blocks_startup() {
        let repo = MemoryRepo::new("feature", "main");
        repo.detach(repo.branch_tip("feature").unwrap());
        let (mut c, mut e) = (Scripted::default(), Recorder::default());
        assert!(matches!(
            open(&repo, &mut c, &mut e),
            Err(SyncError::Precondition(Precondition::DetachedHead))
        ));
    }

    #[test]
    fn integration_branch_itself_is_refused() {
        let repo = MemoryRepo::new("main", "main");
        let (mut c, mut e) = (Scripted::default(), Recorder::default());
        assert!(matches!(
            open(&repo, &mut c, &mut e),
            Err(SyncError::Precondition(Precondition::OnIntegrationBranch { .. }))
        ));
    }

    #[test]
    fn ambiguous_base_is_a_precondition_violation() {
        let repo = MemoryRepo::new("feature", "main");
        let root = repo.branch_tip("feature").unwrap();
        let a = repo.raw_commit(&[root], &[("a", "1")], "a");
        let b = repo.raw_commit(&[root], &[("b", "1")], "b");
        let local = repo.raw_commit(&[a, b], &[("x", "1")], "x");
        let trunk = repo.raw_commit(&[b, a], &[("y", "1")], "y");
        repo.set_branch("feature", local);
        repo.set_remote_branch("main", trunk);
        repo.fetch("origin", trisync_git::FetchOptions::default()).unwrap();

        let (mut c, mut e) = (Scripted::default(), Recorder::default());
        let session = open(&repo, &mut c, &mut e).unwrap();
        match session.refresh() {
            Err(SyncError::Precondition(Precondition::AmbiguousBase { candidates, .. })) => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected ambiguous base, got {other:?}"),
        }
    }
}
