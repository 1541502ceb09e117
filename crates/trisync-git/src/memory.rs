//! An in-memory [`GitRepo`] with a simulated remote.
//!
//! `MemoryRepo` models a single local clone and the remote it talks to:
//! commits are full file snapshots, the remote is a second set of branch
//! pointers over the same object store, and remote-tracking refs only move on
//! fetch or on an accepted push. Ancestry, merge-base ambiguity, three-way
//! conflicts, leases and rebase/abort behave like git at file granularity,
//! which is enough to drive every decision path of the engine in unit tests.
//!
//! ```
//! use trisync_git::{GitRepo, MemoryRepo, PushMode, BranchName};
//!
//! let repo = MemoryRepo::new("feature", "main");
//! repo.commit_file("a.txt", "hello\n", "add a");
//! let branch = BranchName::new("feature").unwrap();
//! assert!(repo.push("origin", &branch, PushMode::Plain).unwrap().is_accepted());
//! assert_eq!(repo.remote_tip("feature"), repo.branch_tip("feature"));
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::*;

type Tree = BTreeMap<String, String>;

/// Name of the simulated remote.
pub const REMOTE: &str = "origin";

const AUTHOR_NAME: &str = "Test User";
const AUTHOR_EMAIL: &str = "test@example.com";

#[derive(Clone, Debug)]
struct MemCommit {
    parents: Vec<GitOid>,
    tree: Tree,
    message: String,
    author_name: String,
    author_email: String,
    author_time: i64,
    commit_time: i64,
}

#[derive(Clone, Debug)]
struct Snapshot {
    branch_tip: GitOid,
    index: Tree,
    worktree: Tree,
}

#[derive(Debug)]
struct State {
    commits: HashMap<GitOid, MemCommit>,
    next_id: u64,
    clock: i64,
    /// Author date for new commits, like `GIT_AUTHOR_DATE`.
    pinned_author_time: Option<i64>,
    head: Option<String>,
    detached: Option<GitOid>,
    branches: BTreeMap<String, GitOid>,
    tracking: BTreeMap<String, GitOid>,
    remote: BTreeMap<String, GitOid>,
    index: Tree,
    worktree: Tree,
    rebase_in_progress: Option<Snapshot>,
    unmerged: bool,
    stash: Vec<(Tree, Tree)>,
    config: BTreeMap<String, String>,
    calls: Vec<String>,
}

/// In-memory repository plus remote. See the [module docs](self).
#[derive(Debug)]
pub struct MemoryRepo {
    state: RefCell<State>,
}

impl MemoryRepo {
    /// A repository whose remote has `integration` at a single root commit,
    /// already fetched, with `branch` created at that commit and checked out.
    #[must_use]
    pub fn new(branch: &str, integration: &str) -> Self {
        let mut state = State {
            commits: HashMap::new(),
            next_id: 1,
            clock: 1_700_000_000,
            pinned_author_time: None,
            head: Some(branch.to_owned()),
            detached: None,
            branches: BTreeMap::new(),
            tracking: BTreeMap::new(),
            remote: BTreeMap::new(),
            index: Tree::new(),
            worktree: Tree::new(),
            rebase_in_progress: None,
            unmerged: false,
            stash: Vec::new(),
            config: BTreeMap::new(),
            calls: Vec::new(),
        };
        state
            .config
            .insert("user.name".to_owned(), AUTHOR_NAME.to_owned());
        state
            .config
            .insert("user.email".to_owned(), AUTHOR_EMAIL.to_owned());

        let mut tree = Tree::new();
        tree.insert("README.md".to_owned(), "# project\n".to_owned());
        let root = state.new_commit(Vec::new(), tree.clone(), "initial commit");
        state.remote.insert(integration.to_owned(), root);
        state.tracking.insert(integration.to_owned(), root);
        state.branches.insert(branch.to_owned(), root);
        state.index = tree.clone();
        state.worktree = tree;
        Self {
            state: RefCell::new(state),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario building
    // -----------------------------------------------------------------------

    /// Write `path` in the working tree and commit it on the checked-out
    /// branch. Returns the new commit.
    ///
    /// # Panics
    /// Panics when HEAD is detached.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> GitOid {
        let mut s = self.state.borrow_mut();
        let head = s.head_oid().expect("commit_file needs a checked-out branch");
        let mut tree = s.commits[&head].tree.clone();
        tree.insert(path.to_owned(), content.to_owned());
        let oid = s.new_commit(vec![head], tree.clone(), message);
        let branch = s.head.clone().expect("commit_file needs a checked-out branch");
        s.branches.insert(branch, oid);
        s.index = tree.clone();
        s.worktree = tree;
        oid
    }

    /// Simulate someone else pushing a commit that writes `path` on top of
    /// the remote's `branch` (created from the remote's `from` branch when it
    /// does not exist). Remote-tracking refs are left stale.
    ///
    /// # Panics
    /// Panics when neither `branch` nor `from` exists on the remote.
    pub fn remote_commit(&self, branch: &str, from: &str, path: &str, content: &str, message: &str) -> GitOid {
        let mut s = self.state.borrow_mut();
        let parent = s
            .remote
            .get(branch)
            .or_else(|| s.remote.get(from))
            .copied()
            .expect("remote_commit needs an existing remote branch");
        let mut tree = s.commits[&parent].tree.clone();
        tree.insert(path.to_owned(), content.to_owned());
        let oid = s.new_commit(vec![parent], tree, message);
        s.remote.insert(branch.to_owned(), oid);
        oid
    }

    /// Create a commit with explicit parents and the given file changes
    /// applied to the first parent's tree. No ref moves.
    ///
    /// # Panics
    /// Panics when a parent is unknown.
    pub fn raw_commit(&self, parents: &[GitOid], changes: &[(&str, &str)], message: &str) -> GitOid {
        let mut s = self.state.borrow_mut();
        let mut tree = parents
            .first()
            .map(|p| s.commits[p].tree.clone())
            .unwrap_or_default();
        for (path, content) in changes {
            tree.insert((*path).to_owned(), (*content).to_owned());
        }
        s.new_commit(parents.to_vec(), tree, message)
    }

    /// Point a local branch at `oid` (creating it when missing). When the
    /// branch is checked out, index and working tree follow.
    pub fn set_branch(&self, branch: &str, oid: GitOid) {
        let mut s = self.state.borrow_mut();
        s.branches.insert(branch.to_owned(), oid);
        if s.head.as_deref() == Some(branch) {
            let tree = s.commits[&oid].tree.clone();
            s.index = tree.clone();
            s.worktree = tree;
        }
    }

    /// Point the remote's `branch` at `oid` without touching tracking refs.
    pub fn set_remote_branch(&self, branch: &str, oid: GitOid) {
        self.state.borrow_mut().remote.insert(branch.to_owned(), oid);
    }

    /// Check out `branch`, creating it at `at` when given.
    pub fn checkout(&self, branch: &str, at: Option<GitOid>) {
        if let Some(oid) = at {
            self.state
                .borrow_mut()
                .branches
                .insert(branch.to_owned(), oid);
        }
        let mut s = self.state.borrow_mut();
        s.head = Some(branch.to_owned());
        s.detached = None;
        if let Some(oid) = s.branches.get(branch).copied() {
            let tree = s.commits[&oid].tree.clone();
            s.index = tree.clone();
            s.worktree = tree;
        }
    }

    /// Detach HEAD at `oid`.
    pub fn detach(&self, oid: GitOid) {
        let mut s = self.state.borrow_mut();
        s.head = None;
        s.detached = Some(oid);
    }

    /// Write a file in the working tree only.
    pub fn write_worktree(&self, path: &str, content: &str) {
        self.state
            .borrow_mut()
            .worktree
            .insert(path.to_owned(), content.to_owned());
    }

    /// Write a file in the working tree and stage it.
    pub fn stage_file(&self, path: &str, content: &str) {
        let mut s = self.state.borrow_mut();
        s.worktree.insert(path.to_owned(), content.to_owned());
        s.index.insert(path.to_owned(), content.to_owned());
    }

    /// Mark the index as holding unresolved conflicts.
    pub fn set_unmerged(&self, unmerged: bool) {
        self.state.borrow_mut().unmerged = unmerged;
    }

    /// Set a config value.
    pub fn set_config(&self, key: &str, value: &str) {
        self.state
            .borrow_mut()
            .config
            .insert(key.to_owned(), value.to_owned());
    }

    /// Move the clock forward; later commits get later timestamps.
    pub fn advance_clock(&self, seconds: i64) {
        self.state.borrow_mut().clock += seconds;
    }

    /// Give new commits this author time (committer time keeps following
    /// the clock). `None` restores the default.
    pub fn pin_author_time(&self, time: Option<i64>) {
        self.state.borrow_mut().pinned_author_time = time;
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Local branch tip.
    #[must_use]
    pub fn branch_tip(&self, branch: &str) -> Option<GitOid> {
        self.state.borrow().branches.get(branch).copied()
    }

    /// The remote's value of `branch`.
    #[must_use]
    pub fn remote_tip(&self, branch: &str) -> Option<GitOid> {
        self.state.borrow().remote.get(branch).copied()
    }

    /// The remote-tracking ref for `branch`.
    #[must_use]
    pub fn tracking_tip(&self, branch: &str) -> Option<GitOid> {
        self.state.borrow().tracking.get(branch).copied()
    }

    /// Parents of a commit.
    #[must_use]
    pub fn parents(&self, oid: GitOid) -> Vec<GitOid> {
        self.state
            .borrow()
            .commits
            .get(&oid)
            .map(|c| c.parents.clone())
            .unwrap_or_default()
    }

    /// Content of `path` in commit `oid`.
    #[must_use]
    pub fn file_at(&self, oid: GitOid, path: &str) -> Option<String> {
        self.state
            .borrow()
            .commits
            .get(&oid)
            .and_then(|c| c.tree.get(path).cloned())
    }

    /// Content of `path` in the working tree.
    #[must_use]
    pub fn worktree_file(&self, path: &str) -> Option<String> {
        self.state.borrow().worktree.get(path).cloned()
    }

    /// Message of commit `oid`.
    #[must_use]
    pub fn message(&self, oid: GitOid) -> Option<String> {
        self.state
            .borrow()
            .commits
            .get(&oid)
            .map(|c| c.message.clone())
    }

    /// Every mutating call made so far, in order (`"fetch"`, `"push:lease"`,
    /// `"rewrite"`, ...).
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Whether any recorded call starts with `prefix`.
    #[must_use]
    pub fn called(&self, prefix: &str) -> bool {
        self.state
            .borrow()
            .calls
            .iter()
            .any(|c| c.starts_with(prefix))
    }
}

// ---------------------------------------------------------------------------
// Graph helpers
// ---------------------------------------------------------------------------

impl State {
    fn new_commit(&mut self, parents: Vec<GitOid>, tree: Tree, message: &str) -> GitOid {
        // Scrambled prefix so short ids differ; the counter keeps them unique.
        let mut bytes = [0u8; 20];
        let scrambled = self.next_id.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        bytes[..8].copy_from_slice(&scrambled.to_be_bytes());
        bytes[12..].copy_from_slice(&self.next_id.to_be_bytes());
        self.next_id += 1;
        self.clock += 60;
        let oid = GitOid::from_bytes(bytes);
        let (author_name, author_email) = (
            self.config
                .get("user.name")
                .cloned()
                .unwrap_or_else(|| AUTHOR_NAME.to_owned()),
            self.config
                .get("user.email")
                .cloned()
                .unwrap_or_else(|| AUTHOR_EMAIL.to_owned()),
        );
        self.commits.insert(
            oid,
            MemCommit {
                parents,
                tree,
                message: message.to_owned(),
                author_name,
                author_email,
                author_time: self.pinned_author_time.unwrap_or(self.clock),
                commit_time: self.clock,
            },
        );
        oid
    }

    fn commit(&self, oid: GitOid) -> Result<&MemCommit, GitError> {
        self.commits.get(&oid).ok_or_else(|| GitError::NotFound {
            message: format!("commit {oid}"),
        })
    }

    fn head_oid(&self) -> Option<GitOid> {
        match &self.head {
            Some(b) => self.branches.get(b).copied(),
            None => self.detached,
        }
    }

    fn head_branch(&self) -> Result<String, GitError> {
        self.head.clone().ok_or_else(|| GitError::BackendError {
            message: "HEAD is detached".to_owned(),
        })
    }

    /// `oid` and everything reachable from it.
    fn ancestors(&self, oid: GitOid) -> Result<BTreeSet<GitOid>, GitError> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([oid]);
        while let Some(next) = queue.pop_front() {
            if seen.insert(next) {
                queue.extend(self.commit(next)?.parents.iter().copied());
            }
        }
        Ok(seen)
    }

    fn is_ancestor(&self, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError> {
        Ok(self.ancestors(descendant)?.contains(&ancestor))
    }

    fn merge_bases(&self, a: GitOid, b: GitOid) -> Result<Vec<GitOid>, GitError> {
        let left = self.ancestors(a)?;
        let right = self.ancestors(b)?;
        let common: Vec<GitOid> = left.intersection(&right).copied().collect();
        let mut best = Vec::new();
        for &candidate in &common {
            let mut dominated = false;
            for &other in &common {
                if other != candidate && self.is_ancestor(candidate, other)? {
                    dominated = true;
                    break;
                }
            }
            if !dominated {
                best.push(candidate);
            }
        }
        Ok(best)
    }

    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<GitOid, GitError> {
        let mut bases = self.merge_bases(a, b)?;
        match bases.len() {
            0 => Err(GitError::NoMergeBase { left: a, right: b }),
            1 => Ok(bases.remove(0)),
            _ => Err(GitError::AmbiguousMergeBase {
                left: a,
                right: b,
                candidates: bases,
            }),
        }
    }

    /// Commits reachable from `to` but not from `from`, newest first.
    fn between(&self, from: GitOid, to: GitOid) -> Result<Vec<GitOid>, GitError> {
        let exclude = self.ancestors(from)?;
        let mut commits: Vec<GitOid> = self
            .ancestors(to)?
            .into_iter()
            .filter(|c| !exclude.contains(c))
            .collect();
        commits.sort_by_key(|c| std::cmp::Reverse(self.commits[c].commit_time));
        Ok(commits)
    }

    /// Rebase the checked-out branch onto `target`. On conflict the branch
    /// is left untouched and a rebase is recorded as in progress.
    fn rebase_onto(&mut self, target: GitOid, autostash: bool) -> Result<RewriteOutcome, GitError> {
        if self.rebase_in_progress.is_some() {
            return Err(GitError::BackendError {
                message: "a rebase is already in progress".to_owned(),
            });
        }
        let branch = self.head_branch()?;
        let head = self.branches[&branch];
        let head_tree = self.commit(head)?.tree.clone();
        if (self.index != head_tree || self.worktree != head_tree) && !autostash {
            return Err(GitError::CommandFailed {
                command: "git rebase".to_owned(),
                stderr: "cannot rebase: You have unstaged changes.".to_owned(),
            });
        }
        let overlay: Tree = self
            .worktree
            .iter()
            .filter(|(path, content)| head_tree.get(*path) != Some(*content))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect();

        let mut replay = self.between(target, head)?;
        replay.reverse();
        let mut tip = target;
        for oid in replay {
            let commit = self.commit(oid)?.clone();
            let parent_tree = match commit.parents.first() {
                Some(p) => self.commit(*p)?.tree.clone(),
                None => Tree::new(),
            };
            let tip_tree = self.commit(tip)?.tree.clone();
            let Ok(merged) = three_way(&parent_tree, &tip_tree, &commit.tree) else {
                self.rebase_in_progress = Some(Snapshot {
                    branch_tip: head,
                    index: self.index.clone(),
                    worktree: self.worktree.clone(),
                });
                return Ok(RewriteOutcome::Conflict);
            };
            if merged == tip_tree {
                continue;
            }
            tip = self.new_commit(vec![tip], merged, &commit.message);
            // Replayed commits keep their author.
            if let Some(replayed) = self.commits.get_mut(&tip) {
                replayed.author_name = commit.author_name;
                replayed.author_email = commit.author_email;
                replayed.author_time = commit.author_time;
            }
        }

        self.branches.insert(branch, tip);
        let mut tree = self.commit(tip)?.tree.clone();
        self.index = tree.clone();
        tree.extend(overlay);
        self.worktree = tree;
        Ok(RewriteOutcome::Clean)
    }
}

/// File-level three-way merge. `Err` lists conflicting paths.
fn three_way(base: &Tree, ours: &Tree, theirs: &Tree) -> Result<Tree, Vec<String>> {
    let paths: BTreeSet<&String> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();
    let mut merged = Tree::new();
    let mut conflicts = Vec::new();
    for path in paths {
        let (b, o, t) = (base.get(path), ours.get(path), theirs.get(path));
        let pick = if o == t || t == b {
            o
        } else if o == b {
            t
        } else {
            conflicts.push(path.clone());
            continue;
        };
        if let Some(content) = pick {
            merged.insert(path.clone(), content.clone());
        }
    }
    if conflicts.is_empty() {
        Ok(merged)
    } else {
        Err(conflicts)
    }
}

// ---------------------------------------------------------------------------
// GitRepo
// ---------------------------------------------------------------------------

impl GitRepo for MemoryRepo {
    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let s = self.state.borrow();
        s.head
            .as_deref()
            .map(BranchName::new)
            .transpose()
            .map_err(|e| GitError::BackendError {
                message: e.to_string(),
            })
    }

    fn has_remote(&self, remote: &str) -> Result<bool, GitError> {
        Ok(remote == REMOTE)
    }

    fn has_unmerged_paths(&self) -> Result<bool, GitError> {
        Ok(self.state.borrow().unmerged)
    }

    fn read_config(&self, key: &str) -> Result<Option<String>, GitError> {
        Ok(self.state.borrow().config.get(key).cloned())
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<GitOid>, GitError> {
        let s = self.state.borrow();
        if name == "HEAD" {
            return Ok(s.head_oid());
        }
        if let Some(branch) = name.strip_prefix("refs/heads/") {
            return Ok(s.branches.get(branch).copied());
        }
        let tracking_prefix = format!("refs/remotes/{REMOTE}/");
        if let Some(branch) = name.strip_prefix(tracking_prefix.as_str()) {
            return Ok(s.tracking.get(branch).copied());
        }
        Ok(None)
    }

    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        let s = self.state.borrow();
        let c = s.commit(oid)?;
        Ok(CommitInfo {
            oid,
            author_name: c.author_name.clone(),
            author_email: c.author_email.clone(),
            author_time: c.author_time,
            commit_time: c.commit_time,
            summary: c.message.lines().next().unwrap_or_default().to_owned(),
        })
    }

    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<GitOid, GitError> {
        self.state.borrow().merge_base(a, b)
    }

    fn commits_between(&self, from: GitOid, to: GitOid) -> Result<Vec<GitOid>, GitError> {
        self.state.borrow().between(from, to)
    }

    fn would_conflict(&self, a: GitOid, b: GitOid) -> Result<bool, GitError> {
        let s = self.state.borrow();
        let base_tree = match s.merge_base(a, b) {
            Ok(base) => s.commit(base)?.tree.clone(),
            Err(GitError::NoMergeBase { .. }) => Tree::new(),
            Err(e) => return Err(e),
        };
        Ok(three_way(&base_tree, &s.commit(a)?.tree, &s.commit(b)?.tree).is_err())
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        let s = self.state.borrow();
        let head_tree = match s.head_oid() {
            Some(h) => s.commit(h)?.tree.clone(),
            None => Tree::new(),
        };
        Ok(s.index != head_tree || s.worktree != s.index)
    }

    fn has_changes(&self) -> Result<bool, GitError> {
        self.is_dirty()
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        let s = self.state.borrow();
        let head_tree = match s.head_oid() {
            Some(h) => s.commit(h)?.tree.clone(),
            None => Tree::new(),
        };
        Ok(s.index != head_tree)
    }

    fn pending_operation(&self) -> Result<Option<PendingOperation>, GitError> {
        Ok(self
            .state
            .borrow()
            .rebase_in_progress
            .as_ref()
            .map(|_| PendingOperation::Rebase))
    }

    fn fetch(&self, remote: &str, options: FetchOptions) -> Result<(), GitError> {
        let mut s = self.state.borrow_mut();
        s.calls.push("fetch".to_owned());
        if remote != REMOTE {
            return Err(GitError::CommandFailed {
                command: format!("git fetch {remote}"),
                stderr: format!("fatal: '{remote}' does not appear to be a git repository"),
            });
        }
        let remote = s.remote.clone();
        if options.prune {
            s.tracking = remote;
        } else {
            s.tracking.extend(remote);
        }
        Ok(())
    }

    fn pull(
        &self,
        remote: &str,
        branch: &BranchName,
        options: PullOptions,
    ) -> Result<RewriteOutcome, GitError> {
        let mut s = self.state.borrow_mut();
        s.calls.push("pull".to_owned());
        let Some(theirs) = s.remote.get(branch.as_str()).copied() else {
            return Err(GitError::CommandFailed {
                command: format!("git pull {remote} {branch}"),
                stderr: format!("fatal: couldn't find remote ref {branch}"),
            });
        };
        s.tracking.insert(branch.as_str().to_owned(), theirs);
        let local = s.branches[&s.head_branch()?];
        if s.is_ancestor(theirs, local)? {
            return Ok(RewriteOutcome::Clean);
        }
        if s.is_ancestor(local, theirs)? {
            let head_tree = s.commit(local)?.tree.clone();
            let dirty = s.worktree != head_tree || s.index != head_tree;
            if dirty && !options.autostash {
                return Err(GitError::CommandFailed {
                    command: format!("git pull {remote} {branch}"),
                    stderr: "error: Your local changes would be overwritten".to_owned(),
                });
            }
            // Fast-forward carries uncommitted edits along like an autostash.
            let overlay: Tree = s
                .worktree
                .iter()
                .filter(|(p, c)| head_tree.get(*p) != Some(*c))
                .map(|(p, c)| (p.clone(), c.clone()))
                .collect();
            let name = s.head_branch()?;
            s.branches.insert(name, theirs);
            let mut tree = s.commit(theirs)?.tree.clone();
            s.index = tree.clone();
            tree.extend(overlay);
            s.worktree = tree;
            return Ok(RewriteOutcome::Clean);
        }
        if !options.rebase {
            return Err(GitError::BackendError {
                message: "merge pulls are not simulated".to_owned(),
            });
        }
        s.rebase_onto(theirs, options.autostash)
    }

    fn push(
        &self,
        _remote: &str,
        branch: &BranchName,
        mode: PushMode,
    ) -> Result<PushOutcome, GitError> {
        let mut s = self.state.borrow_mut();
        let label = match mode {
            PushMode::Plain => "push:plain",
            PushMode::Lease { .. } => "push:lease",
            PushMode::Force => "push:force",
        };
        s.calls.push(label.to_owned());
        let Some(local) = s.branches.get(branch.as_str()).copied() else {
            return Err(GitError::NotFound {
                message: format!("local branch {branch}"),
            });
        };
        let current = s.remote.get(branch.as_str()).copied();
        let accepted = match mode {
            PushMode::Plain => match current {
                None => true,
                Some(c) => s.is_ancestor(c, local)?,
            },
            PushMode::Lease { expected } => current == expected,
            PushMode::Force => true,
        };
        if !accepted {
            let reason = match mode {
                PushMode::Lease { .. } => "stale info",
                _ => "non-fast-forward",
            };
            return Ok(PushOutcome::Rejected {
                details: format!("! [rejected] {branch} -> {branch} ({reason})"),
            });
        }
        s.remote.insert(branch.as_str().to_owned(), local);
        s.tracking.insert(branch.as_str().to_owned(), local);
        Ok(PushOutcome::Accepted)
    }

    fn rewrite_onto(&self, target: GitOid, autostash: bool) -> Result<RewriteOutcome, GitError> {
        let mut s = self.state.borrow_mut();
        s.calls.push("rewrite".to_owned());
        s.commit(target)?;
        s.rebase_onto(target, autostash)
    }

    fn abort_rewrite(&self) -> Result<(), GitError> {
        let mut s = self.state.borrow_mut();
        s.calls.push("abort".to_owned());
        let Some(snapshot) = s.rebase_in_progress.take() else {
            return Err(GitError::CommandFailed {
                command: "git rebase --abort".to_owned(),
                stderr: "fatal: No rebase in progress?".to_owned(),
            });
        };
        let branch = s.head_branch()?;
        s.branches.insert(branch, snapshot.branch_tip);
        s.index = snapshot.index;
        s.worktree = snapshot.worktree;
        Ok(())
    }

    fn reset_to(&self, oid: GitOid, mode: ResetMode) -> Result<(), GitError> {
        let mut s = self.state.borrow_mut();
        s.calls.push(match mode {
            ResetMode::Soft => "reset:soft".to_owned(),
            ResetMode::Mixed => "reset:mixed".to_owned(),
        });
        let tree = s.commit(oid)?.tree.clone();
        let branch = s.head_branch()?;
        s.branches.insert(branch, oid);
        if mode == ResetMode::Mixed {
            s.index = tree;
        }
        Ok(())
    }

    fn commit_all(&self, message: &str) -> Result<Option<GitOid>, GitError> {
        let mut s = self.state.borrow_mut();
        s.calls.push("commit".to_owned());
        let branch = s.head_branch()?;
        let head = s.branches[&branch];
        let head_tree = s.commit(head)?.tree.clone();
        let tree = if s.index != head_tree {
            s.index.clone()
        } else if s.worktree != head_tree {
            s.worktree.clone()
        } else {
            return Ok(None);
        };
        let oid = s.new_commit(vec![head], tree.clone(), message);
        s.branches.insert(branch, oid);
        s.index = tree;
        Ok(Some(oid))
    }

    fn abort_operation(&self, operation: PendingOperation) -> Result<(), GitError> {
        match operation {
            PendingOperation::Rebase => self.abort_rewrite(),
            other => Err(GitError::BackendError {
                message: format!("no {other} in progress"),
            }),
        }
    }

    fn stash_count(&self) -> Result<usize, GitError> {
        Ok(self.state.borrow().stash.len())
    }

    fn stash_push(&self) -> Result<(), GitError> {
        let mut s = self.state.borrow_mut();
        s.calls.push("stash:push".to_owned());
        let head = s.head_oid().ok_or_else(|| GitError::BackendError {
            message: "no HEAD".to_owned(),
        })?;
        let tree = s.commit(head)?.tree.clone();
        let entry = (s.index.clone(), s.worktree.clone());
        s.stash.push(entry);
        s.index = tree.clone();
        s.worktree = tree;
        Ok(())
    }

    fn stash_pop(&self) -> Result<(), GitError> {
        let mut s = self.state.borrow_mut();
        s.calls.push("stash:pop".to_owned());
        let (index, worktree) = s.stash.pop().ok_or_else(|| GitError::CommandFailed {
            command: "git stash pop".to_owned(),
            stderr: "No stash entries found.".to_owned(),
        })?;
        s.index = index;
        s.worktree = worktree;
        Ok(())
    }

    fn submodule_update(&self, remote_latest: bool) -> Result<(), GitError> {
        self.state.borrow_mut().calls.push(if remote_latest {
            "submodule:remote".to_owned()
        } else {
            "submodule".to_owned()
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn feature() -> BranchName {
        BranchName::new("feature").unwrap()
    }

    #[test]
    fn new_repo_has_fetched_integration_and_checked_out_branch() {
        let repo = MemoryRepo::new("feature", "main");
        let main = repo.tracking_tip("main").unwrap();
        assert_eq!(repo.remote_tip("main"), Some(main));
        assert_eq!(repo.branch_tip("feature"), Some(main));
        assert_eq!(repo.current_branch().unwrap(), Some(feature()));
        assert!(!repo.is_dirty().unwrap());
    }

    #[test]
    fn commits_between_is_newest_first() {
        let repo = MemoryRepo::new("feature", "main");
        let root = repo.branch_tip("feature").unwrap();
        let a = repo.commit_file("a", "1", "a");
        let b = repo.commit_file("b", "1", "b");
        assert_eq!(repo.commits_between(root, b).unwrap(), vec![b, a]);
        assert!(repo.commits_between(b, root).unwrap().is_empty());
    }

    #[test]
    fn criss_cross_history_has_ambiguous_merge_base() {
        let repo = MemoryRepo::new("feature", "main");
        let root = repo.branch_tip("feature").unwrap();
        let a = repo.raw_commit(&[root], &[("a", "1")], "a");
        let b = repo.raw_commit(&[root], &[("b", "1")], "b");
        let x = repo.raw_commit(&[a, b], &[("x", "1")], "x");
        let y = repo.raw_commit(&[b, a], &[("y", "1")], "y");
        match repo.merge_base(x, y) {
            Err(GitError::AmbiguousMergeBase { candidates, .. }) => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn unrelated_histories_have_no_merge_base() {
        let repo = MemoryRepo::new("feature", "main");
        let lonely = repo.raw_commit(&[], &[("z", "1")], "orphan");
        let root = repo.branch_tip("feature").unwrap();
        assert!(matches!(
            repo.merge_base(root, lonely),
            Err(GitError::NoMergeBase { .. })
        ));
    }

    #[test]
    fn would_conflict_is_pure() {
        let repo = MemoryRepo::new("feature", "main");
        let ours = repo.commit_file("f", "mine", "mine");
        let theirs = repo.remote_commit("main", "main", "f", "theirs", "theirs");
        let calls_before = repo.calls();
        assert!(repo.would_conflict(ours, theirs).unwrap());
        assert!(repo.would_conflict(ours, theirs).unwrap());
        assert_eq!(repo.calls(), calls_before);
        assert_eq!(repo.branch_tip("feature"), Some(ours));
    }

    #[test]
    fn conflicting_rebase_then_abort_restores_branch() {
        let repo = MemoryRepo::new("feature", "main");
        let ours = repo.commit_file("f", "mine", "mine");
        let theirs = repo.remote_commit("main", "main", "f", "theirs", "theirs");
        assert_eq!(
            repo.rewrite_onto(theirs, true).unwrap(),
            RewriteOutcome::Conflict
        );
        assert_eq!(
            repo.pending_operation().unwrap(),
            Some(PendingOperation::Rebase)
        );
        repo.abort_rewrite().unwrap();
        assert_eq!(repo.pending_operation().unwrap(), None);
        assert_eq!(repo.branch_tip("feature"), Some(ours));
        assert_eq!(repo.worktree_file("f").as_deref(), Some("mine"));
    }

    #[test]
    fn clean_rebase_replays_commits() {
        let repo = MemoryRepo::new("feature", "main");
        repo.commit_file("a", "1", "a");
        repo.commit_file("b", "1", "b");
        let theirs = repo.remote_commit("main", "main", "c", "1", "c");
        assert_eq!(repo.rewrite_onto(theirs, true).unwrap(), RewriteOutcome::Clean);
        let tip = repo.branch_tip("feature").unwrap();
        assert_eq!(repo.commits_between(theirs, tip).unwrap().len(), 2);
        assert_eq!(repo.file_at(tip, "c").as_deref(), Some("1"));
    }

    #[test]
    fn lease_push_checks_expected_value() {
        let repo = MemoryRepo::new("feature", "main");
        repo.commit_file("a", "1", "a");
        let stale = Some(repo.remote_commit("feature", "main", "x", "1", "someone"));
        repo.set_remote_branch("feature", repo.remote_tip("main").unwrap());
        let outcome = repo
            .push(REMOTE, &feature(), PushMode::Lease { expected: stale })
            .unwrap();
        assert!(!outcome.is_accepted());
        let current = repo.remote_tip("feature");
        let outcome = repo
            .push(REMOTE, &feature(), PushMode::Lease { expected: current })
            .unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(repo.remote_tip("feature"), repo.branch_tip("feature"));
    }

    #[test]
    fn soft_reset_then_commit_squashes() {
        let repo = MemoryRepo::new("feature", "main");
        let root = repo.branch_tip("feature").unwrap();
        repo.commit_file("a", "1", "a");
        repo.commit_file("b", "2", "b");
        repo.reset_to(root, ResetMode::Soft).unwrap();
        let squashed = repo.commit_all("squash").unwrap().unwrap();
        assert_eq!(repo.parents(squashed), vec![root]);
        assert_eq!(repo.file_at(squashed, "a").as_deref(), Some("1"));
        assert_eq!(repo.file_at(squashed, "b").as_deref(), Some("2"));
        assert_eq!(repo.commit_all("again").unwrap(), None);
    }
}
