use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use trisync_git::{
    BranchName, FetchOptions, GitError, GitOid, GitRepo, GixRepo, PendingOperation, PushMode,
    ResetMode, RewriteOutcome,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("LC_ALL", "C")
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

fn oid(dir: &Path, rev: &str) -> GitOid {
    git(dir, &["rev-parse", rev]).parse().unwrap()
}

fn commit_file(dir: &Path, path: &str, content: &str, msg: &str) -> GitOid {
    std::fs::write(dir.join(path), content).unwrap();
    git(dir, &["add", path]);
    git(dir, &["commit", "--quiet", "-m", msg]);
    oid(dir, "HEAD")
}

/// A clone with `main` pushed to a bare `origin` and `feature` checked out.
struct Fixture {
    root: TempDir,
    work: std::path::PathBuf,
    remote: std::path::PathBuf,
    repo: GixRepo,
}

fn setup() -> Fixture {
    let root = TempDir::new().unwrap();
    let remote = root.path().join("remote.git");
    let work = root.path().join("work");
    std::fs::create_dir_all(&work).unwrap();
    git(root.path(), &["init", "--quiet", "--bare", "-b", "main", remote.to_str().unwrap()]);
    git(&work, &["init", "--quiet", "-b", "main"]);
    git(&work, &["config", "user.email", "test@test.com"]);
    git(&work, &["config", "user.name", "Test User"]);
    git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);
    commit_file(&work, "README.md", "# project\n", "initial commit");
    git(&work, &["push", "--quiet", "origin", "main"]);
    git(&work, &["checkout", "--quiet", "-b", "feature"]);
    let repo = GixRepo::open(&work).unwrap();
    Fixture {
        root,
        work,
        remote,
        repo,
    }
}

/// Push a commit to `origin/<branch>` from a second clone.
fn someone_else_pushes(fx: &Fixture, branch: &str, path: &str, content: &str) -> GitOid {
    let other = fx.root.path().join(format!("other-{branch}-{path}"));
    git(
        fx.root.path(),
        &["clone", "--quiet", fx.remote.to_str().unwrap(), other.to_str().unwrap()],
    );
    git(&other, &["config", "user.email", "someone@test.com"]);
    git(&other, &["config", "user.name", "Someone Else"]);
    let exists = Command::new("git")
        .args(["rev-parse", "--verify", "--quiet", &format!("origin/{branch}")])
        .current_dir(&other)
        .status()
        .unwrap()
        .success();
    if exists {
        git(&other, &["checkout", "--quiet", branch]);
    } else {
        git(&other, &["checkout", "--quiet", "-b", branch]);
    }
    let pushed = commit_file(&other, path, content, "someone else");
    git(&other, &["push", "--quiet", "origin", branch]);
    pushed
}

fn feature() -> BranchName {
    BranchName::new("feature").unwrap()
}

// ===========================================================================
// Session and refs
// ===========================================================================

#[test]
fn current_branch_and_remote() {
    let fx = setup();
    assert_eq!(fx.repo.current_branch().unwrap(), Some(feature()));
    assert!(fx.repo.has_remote("origin").unwrap());
    assert!(!fx.repo.has_remote("upstream").unwrap());
}

#[test]
fn detached_head_has_no_branch() {
    let fx = setup();
    git(&fx.work, &["checkout", "--quiet", "--detach"]);
    assert_eq!(fx.repo.current_branch().unwrap(), None);
}

#[test]
fn resolve_missing_tracking_ref_is_none() {
    let fx = setup();
    assert_eq!(
        fx.repo.resolve_ref(&feature().tracking_ref("origin")).unwrap(),
        None
    );
    let main = BranchName::new("main").unwrap();
    assert_eq!(
        fx.repo.resolve_ref(&main.tracking_ref("origin")).unwrap(),
        Some(oid(&fx.work, "main"))
    );
}

#[test]
fn read_commit_metadata() {
    let fx = setup();
    let head = oid(&fx.work, "HEAD");
    let info = fx.repo.read_commit(head).unwrap();
    assert_eq!(info.oid, head);
    assert_eq!(info.author_email, "test@test.com");
    assert_eq!(info.summary, "initial commit");
    assert!(info.author_time > 0);
}

#[test]
fn read_commit_separates_author_and_committer_time() {
    let fx = setup();
    std::fs::write(fx.work.join("old.txt"), "1\n").unwrap();
    git(&fx.work, &["add", "old.txt"]);
    let out = Command::new("git")
        .args(["commit", "--quiet", "-m", "old work"])
        .current_dir(&fx.work)
        .env("GIT_AUTHOR_DATE", "@1000000000 +0000")
        .output()
        .unwrap();
    assert!(out.status.success());
    let info = fx.repo.read_commit(oid(&fx.work, "HEAD")).unwrap();
    assert_eq!(info.author_time, 1_000_000_000);
    assert!(info.commit_time > info.author_time);
}

#[test]
fn staged_changes_ignore_unstaged_edits() {
    let fx = setup();
    std::fs::write(fx.work.join("README.md"), "edited\n").unwrap();
    assert!(fx.repo.is_dirty().unwrap());
    assert!(!fx.repo.has_staged_changes().unwrap());
    git(&fx.work, &["add", "README.md"]);
    assert!(fx.repo.has_staged_changes().unwrap());
}

#[test]
fn read_config_unset_is_none() {
    let fx = setup();
    assert_eq!(
        fx.repo.read_config("user.email").unwrap().as_deref(),
        Some("test@test.com")
    );
    assert_eq!(fx.repo.read_config("trisync.nothing").unwrap(), None);
}

// ===========================================================================
// Ancestry
// ===========================================================================

#[test]
fn merge_base_and_commits_between() {
    let fx = setup();
    let root = oid(&fx.work, "HEAD");
    let a = commit_file(&fx.work, "a.txt", "a\n", "a");
    let b = commit_file(&fx.work, "b.txt", "b\n", "b");
    assert_eq!(fx.repo.merge_base(root, b).unwrap(), root);
    assert_eq!(fx.repo.commits_between(root, b).unwrap(), vec![b, a]);
    assert!(fx.repo.commits_between(b, root).unwrap().is_empty());
}

#[test]
fn criss_cross_merge_base_is_ambiguous() {
    let fx = setup();
    let w = &fx.work;
    git(w, &["checkout", "--quiet", "-b", "left", "main"]);
    let l1 = commit_file(w, "l.txt", "l\n", "l1");
    git(w, &["checkout", "--quiet", "-b", "right", "main"]);
    let r1 = commit_file(w, "r.txt", "r\n", "r1");
    git(w, &["merge", "--quiet", "--no-edit", "left"]);
    let x = oid(w, "HEAD");
    git(w, &["checkout", "--quiet", "left"]);
    git(w, &["merge", "--quiet", "--no-edit", &r1.to_string()]);
    let y = oid(w, "HEAD");

    match fx.repo.merge_base(x, y) {
        Err(GitError::AmbiguousMergeBase { candidates, .. }) => {
            assert_eq!(candidates.len(), 2);
            assert!(candidates.contains(&l1));
            assert!(candidates.contains(&r1));
        }
        other => panic!("expected ambiguous merge base, got {other:?}"),
    }
}

#[test]
fn unrelated_histories_have_no_merge_base() {
    let fx = setup();
    let root = oid(&fx.work, "HEAD");
    git(&fx.work, &["checkout", "--quiet", "--orphan", "lonely"]);
    let orphan = commit_file(&fx.work, "z.txt", "z\n", "orphan");
    assert!(matches!(
        fx.repo.merge_base(root, orphan),
        Err(GitError::NoMergeBase { .. })
    ));
}

#[test]
fn would_conflict_does_not_touch_the_worktree() {
    let fx = setup();
    let w = &fx.work;
    let ours = commit_file(w, "f.txt", "ours\n", "ours");
    git(w, &["checkout", "--quiet", "-b", "other", "main"]);
    let theirs = commit_file(w, "f.txt", "theirs\n", "theirs");
    let later = commit_file(w, "g.txt", "g\n", "on top of theirs");
    git(w, &["checkout", "--quiet", "feature"]);

    assert!(fx.repo.would_conflict(ours, theirs).unwrap());
    assert!(fx.repo.would_conflict(ours, theirs).unwrap());
    assert!(fx.repo.would_conflict(ours, later).unwrap());
    let main = oid(w, "main");
    assert!(!fx.repo.would_conflict(ours, main).unwrap());

    assert_eq!(oid(w, "HEAD"), ours);
    assert!(!fx.repo.has_changes().unwrap());
    assert_eq!(fx.repo.pending_operation().unwrap(), None);
}

// ===========================================================================
// Remote
// ===========================================================================

#[test]
fn fetch_updates_tracking_refs() {
    let fx = setup();
    let pushed = someone_else_pushes(&fx, "main", "new.txt", "new\n");
    let tracking = BranchName::new("main").unwrap().tracking_ref("origin");
    assert_ne!(fx.repo.resolve_ref(&tracking).unwrap(), Some(pushed));
    fx.repo.fetch("origin", FetchOptions::default()).unwrap();
    assert_eq!(fx.repo.resolve_ref(&tracking).unwrap(), Some(pushed));
}

#[test]
fn plain_push_creates_branch() {
    let fx = setup();
    let head = commit_file(&fx.work, "a.txt", "a\n", "a");
    let outcome = fx.repo.push("origin", &feature(), PushMode::Plain).unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(git(&fx.remote, &["rev-parse", "refs/heads/feature"]), head.to_string());
}

#[test]
fn lease_push_rejects_when_remote_moved() {
    let fx = setup();
    commit_file(&fx.work, "a.txt", "a\n", "a");
    fx.repo.push("origin", &feature(), PushMode::Plain).unwrap();
    let stale = fx
        .repo
        .resolve_ref(&feature().tracking_ref("origin"))
        .unwrap();
    let theirs = someone_else_pushes(&fx, "feature", "b.txt", "b\n");

    git(&fx.work, &["commit", "--quiet", "--amend", "-m", "rewritten"]);
    let outcome = fx
        .repo
        .push("origin", &feature(), PushMode::Lease { expected: stale })
        .unwrap();
    assert!(!outcome.is_accepted());
    assert_eq!(git(&fx.remote, &["rev-parse", "refs/heads/feature"]), theirs.to_string());

    let outcome = fx
        .repo
        .push("origin", &feature(), PushMode::Lease { expected: Some(theirs) })
        .unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(
        git(&fx.remote, &["rev-parse", "refs/heads/feature"]),
        oid(&fx.work, "HEAD").to_string()
    );
}

#[test]
fn plain_push_of_diverged_branch_is_rejected_not_an_error() {
    let fx = setup();
    someone_else_pushes(&fx, "feature", "b.txt", "b\n");
    commit_file(&fx.work, "a.txt", "a\n", "a");
    let outcome = fx.repo.push("origin", &feature(), PushMode::Plain).unwrap();
    assert!(!outcome.is_accepted());
}

#[test]
fn push_to_missing_remote_is_an_error() {
    let fx = setup();
    let err = fx.repo.push("nowhere", &feature(), PushMode::Plain).unwrap_err();
    assert!(matches!(err, GitError::CommandFailed { .. }), "{err:?}");
}

// ===========================================================================
// Rewrite
// ===========================================================================

#[test]
fn rewrite_conflict_then_abort_restores_branch() {
    let fx = setup();
    let w = &fx.work;
    let ours = commit_file(w, "f.txt", "ours\n", "ours");
    git(w, &["checkout", "--quiet", "-b", "other", "main"]);
    let theirs = commit_file(w, "f.txt", "theirs\n", "theirs");
    git(w, &["checkout", "--quiet", "feature"]);

    assert_eq!(
        fx.repo.rewrite_onto(theirs, true).unwrap(),
        RewriteOutcome::Conflict
    );
    assert_eq!(
        fx.repo.pending_operation().unwrap(),
        Some(PendingOperation::Rebase)
    );
    assert!(fx.repo.has_unmerged_paths().unwrap());

    fx.repo.abort_rewrite().unwrap();
    assert_eq!(fx.repo.pending_operation().unwrap(), None);
    assert_eq!(oid(w, "HEAD"), ours);
    assert_eq!(fx.repo.current_branch().unwrap(), Some(feature()));
}

#[test]
fn clean_rewrite_replays_onto_target() {
    let fx = setup();
    let w = &fx.work;
    commit_file(w, "a.txt", "a\n", "a");
    git(w, &["checkout", "--quiet", "-b", "other", "main"]);
    let theirs = commit_file(w, "b.txt", "b\n", "b");
    git(w, &["checkout", "--quiet", "feature"]);

    assert_eq!(fx.repo.rewrite_onto(theirs, true).unwrap(), RewriteOutcome::Clean);
    let head = oid(w, "HEAD");
    assert_eq!(fx.repo.merge_base(head, theirs).unwrap(), theirs);
    assert_eq!(fx.repo.commits_between(theirs, head).unwrap().len(), 1);
}

#[test]
fn soft_reset_and_commit_all_squash_history() {
    let fx = setup();
    let w = &fx.work;
    let root = oid(w, "HEAD");
    commit_file(w, "a.txt", "a\n", "a");
    commit_file(w, "b.txt", "b\n", "b");
    std::fs::write(w.join("unrelated.txt"), "dirt\n").unwrap();

    fx.repo.reset_to(root, ResetMode::Soft).unwrap();
    let squashed = fx.repo.commit_all("squashed").unwrap().unwrap();
    assert_eq!(fx.repo.commits_between(root, squashed).unwrap(), vec![squashed]);
    // Only the staged delta was committed.
    let files = git(w, &["show", "--name-only", "--format=", "HEAD"]);
    assert!(files.contains("a.txt"));
    assert!(files.contains("b.txt"));
    assert!(!files.contains("unrelated.txt"));
}

#[test]
fn commit_all_stages_everything_when_nothing_staged() {
    let fx = setup();
    assert_eq!(fx.repo.commit_all("nothing").unwrap(), None);
    std::fs::write(fx.work.join("new.txt"), "new\n").unwrap();
    let commit = fx.repo.commit_all("add new").unwrap().unwrap();
    assert_eq!(oid(&fx.work, "HEAD"), commit);
    assert!(!fx.repo.has_changes().unwrap());
}

#[test]
fn stash_round_trip() {
    let fx = setup();
    std::fs::write(fx.work.join("README.md"), "changed\n").unwrap();
    assert!(fx.repo.is_dirty().unwrap());
    fx.repo.stash_push().unwrap();
    assert_eq!(fx.repo.stash_count().unwrap(), 1);
    assert!(!fx.repo.is_dirty().unwrap());
    fx.repo.stash_pop().unwrap();
    assert_eq!(fx.repo.stash_count().unwrap(), 0);
    assert!(fx.repo.is_dirty().unwrap());
}
