//! Shared test helpers for trisync integration tests.
//!
//! All tests use temp directories, no side effects on the real repo. Each
//! test gets a working clone with `main` published to a bare `origin` and a
//! `feature` branch checked out, via [`TestRepo::new`].

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;
use trisync_git::{GitOid, GixRepo};

/// A working clone plus its bare remote.
pub struct TestRepo {
    root: TempDir,
    pub work: PathBuf,
    pub remote: PathBuf,
}

impl TestRepo {
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let remote = root.path().join("remote.git");
        let work = root.path().join("work");
        std::fs::create_dir_all(&work).unwrap();

        git(
            root.path(),
            &["init", "--quiet", "--bare", "-b", "main", remote.to_str().unwrap()],
        );
        git(&work, &["init", "--quiet", "-b", "main"]);
        git(&work, &["config", "user.email", "test@test.com"]);
        git(&work, &["config", "user.name", "Test User"]);
        git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);

        let repo = Self { root, work, remote };
        repo.commit_file("README.md", "# project\n", "initial commit");
        repo.git(&["push", "--quiet", "origin", "main"]);
        repo.git(&["checkout", "--quiet", "-b", "feature"]);
        repo
    }

    pub fn open(&self) -> GixRepo {
        GixRepo::open(&self.work).expect("failed to open test repo")
    }

    /// Run git in the working clone. Panics on failure.
    pub fn git(&self, args: &[&str]) -> String {
        git(&self.work, args)
    }

    pub fn oid(&self, rev: &str) -> GitOid {
        self.git(&["rev-parse", rev]).parse().unwrap()
    }

    pub fn head(&self) -> GitOid {
        self.oid("HEAD")
    }

    pub fn commit_file(&self, path: &str, content: &str, msg: &str) -> GitOid {
        std::fs::write(self.work.join(path), content).unwrap();
        self.git(&["add", path]);
        self.git(&["commit", "--quiet", "-m", msg]);
        self.head()
    }

    /// Read a file from the working tree. `None` if it doesn't exist.
    pub fn read(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(self.work.join(path)).ok()
    }

    /// The remote's value of `branch`, read from the bare repository.
    pub fn remote_tip(&self, branch: &str) -> Option<GitOid> {
        let out = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(&self.remote)
            .output()
            .unwrap();
        out.status
            .success()
            .then(|| String::from_utf8_lossy(&out.stdout).trim().parse().unwrap())
    }

    /// Commit `path` on the remote's `branch` from a second clone, as
    /// another person would. The working clone is not fetched.
    pub fn someone_else_pushes(&self, branch: &str, path: &str, content: &str) -> GitOid {
        let other = self.root.path().join(format!("other-{branch}-{path}"));
        git(
            self.root.path(),
            &["clone", "--quiet", self.remote.to_str().unwrap(), other.to_str().unwrap()],
        );
        git(&other, &["config", "user.email", "someone@test.com"]);
        git(&other, &["config", "user.name", "Someone Else"]);
        if self.remote_tip(branch).is_some() {
            git(&other, &["checkout", "--quiet", branch]);
        } else {
            git(&other, &["checkout", "--quiet", "-b", branch]);
        }
        std::fs::write(other.join(path), content).unwrap();
        git(&other, &["add", path]);
        git(&other, &["commit", "--quiet", "-m", &format!("{path} from someone else")]);
        git(&other, &["push", "--quiet", "origin", branch]);
        git(&other, &["rev-parse", "HEAD"]).parse().unwrap()
    }
}

/// Run a git command in the given directory. Panics on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("LC_ALL", "C")
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {}: {e}", args.join(" ")));
    assert!(
        out.status.success(),
        "git {} failed:\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

/// Run trisync with the given args in the given directory, feeding `stdin`
/// to the confirmation prompts.
pub fn trisync_in(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_trisync"))
        .args(args)
        .current_dir(dir)
        .env_remove("TRISYNC_REMOTE")
        .env_remove("TRISYNC_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to execute trisync");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().expect("failed to wait for trisync")
}

/// Run trisync and assert it succeeds. Returns stdout as string.
pub fn trisync_ok(dir: &Path, args: &[&str], stdin: &str) -> String {
    let out = trisync_in(dir, args, stdin);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "trisync {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}
