//! Ref resolution, commit metadata and ancestry queries.

use crate::cmd::{command_failed, run_git, run_git_predicate, run_git_raw, run_git_stdout};
use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::*;

/// Convert a `gix::oid` to a `GitOid`.
fn from_gix_oid(oid: &gix::oid) -> Result<GitOid, GitError> {
    let bytes: [u8; 20] = oid
        .as_bytes()
        .try_into()
        .map_err(|_| GitError::BackendError {
            message: format!("unsupported object hash length for {oid}"),
        })?;
    Ok(GitOid::from_bytes(bytes))
}

fn parse_oids(stdout: &[u8]) -> Result<Vec<GitOid>, GitError> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.parse::<GitOid>().map_err(GitError::from))
        .collect()
}

pub fn resolve_ref(repo: &GixRepo, name: &str) -> Result<Option<GitOid>, GitError> {
    match repo.repo.try_find_reference(name) {
        Ok(Some(mut r)) => {
            let id = r
                .peel_to_id_in_place()
                .map_err(|e| GitError::BackendError {
                    message: format!("failed to peel {name}: {e}"),
                })?;
            from_gix_oid(id.as_ref()).map(Some)
        }
        Ok(None) => Ok(None),
        Err(e) => Err(GitError::BackendError {
            message: e.to_string(),
        }),
    }
}

pub fn current_branch(repo: &GixRepo) -> Result<Option<BranchName>, GitError> {
    let args = ["symbolic-ref", "--quiet", "--short", "HEAD"];
    let output = run_git_raw(&repo.workdir, &args)?;
    match output.status.code() {
        Some(0) => {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_owned();
            BranchName::new(&name)
                .map(Some)
                .map_err(|e| GitError::BackendError {
                    message: e.to_string(),
                })
        }
        // Exit 1: HEAD is detached.
        Some(1) => Ok(None),
        _ => Err(command_failed(&args, &output)),
    }
}

pub fn has_remote(repo: &GixRepo, remote: &str) -> Result<bool, GitError> {
    let remotes = run_git_stdout(&repo.workdir, &["remote"])?;
    Ok(remotes.lines().any(|r| r.trim() == remote))
}

pub fn read_config(repo: &GixRepo, key: &str) -> Result<Option<String>, GitError> {
    let args = ["config", "--get", key];
    let output = run_git_raw(&repo.workdir, &args)?;
    match output.status.code() {
        Some(0) => Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_owned(),
        )),
        // Exit 1: key not set.
        Some(1) => Ok(None),
        _ => Err(command_failed(&args, &output)),
    }
}

pub fn read_commit(repo: &GixRepo, oid: GitOid) -> Result<CommitInfo, GitError> {
    let spec = oid.to_string();
    let args = ["show", "-s", "--format=%an%x00%ae%x00%at%x00%ct%x00%s", spec.as_str()];
    let output = run_git_raw(&repo.workdir, &args)?;
    if !output.status.success() {
        return Err(GitError::NotFound {
            message: format!("commit {oid}"),
        });
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let mut fields = text.trim_end_matches('\n').splitn(5, '\0');
    let mut next = || fields.next().unwrap_or_default().to_owned();
    let author_name = next();
    let author_email = next();
    let raw_author_time = next();
    let raw_commit_time = next();
    let summary = next();
    let parse_time = |raw: &str| {
        raw.parse::<i64>().map_err(|e| GitError::BackendError {
            message: format!("unparsable timestamp {raw:?} on {oid}: {e}"),
        })
    };
    Ok(CommitInfo {
        oid,
        author_name,
        author_email,
        author_time: parse_time(&raw_author_time)?,
        commit_time: parse_time(&raw_commit_time)?,
        summary,
    })
}

pub fn merge_base(repo: &GixRepo, a: GitOid, b: GitOid) -> Result<GitOid, GitError> {
    let (left, right) = (a.to_string(), b.to_string());
    let args = ["merge-base", "--all", left.as_str(), right.as_str()];
    let output = run_git_raw(&repo.workdir, &args)?;
    match output.status.code() {
        // Exit 1 with no output: unrelated histories.
        Some(0 | 1) => {}
        _ => return Err(command_failed(&args, &output)),
    }
    let mut candidates = parse_oids(&output.stdout)?;
    match candidates.len() {
        0 => Err(GitError::NoMergeBase { left: a, right: b }),
        1 => Ok(candidates.remove(0)),
        _ => Err(GitError::AmbiguousMergeBase {
            left: a,
            right: b,
            candidates,
        }),
    }
}

pub fn commits_between(repo: &GixRepo, from: GitOid, to: GitOid) -> Result<Vec<GitOid>, GitError> {
    let range = format!("{from}..{to}");
    let output = run_git(&repo.workdir, &["rev-list", range.as_str()])?;
    parse_oids(&output.stdout)
}

pub fn would_conflict(repo: &GixRepo, a: GitOid, b: GitOid) -> Result<bool, GitError> {
    let (left, right) = (a.to_string(), b.to_string());
    // Exit 0 = merges cleanly, 1 = conflicts. Only objects are written, never
    // the index, the working tree or a ref.
    let clean = run_git_predicate(
        &repo.workdir,
        &[
            "merge-tree",
            "--write-tree",
            "--no-messages",
            "--allow-unrelated-histories",
            left.as_str(),
            right.as_str(),
        ],
    )?;
    Ok(!clean)
}
