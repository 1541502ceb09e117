//! Divergence between two commits.

use serde::Serialize;
use trisync_git::{GitError, GitOid, GitRepo};

/// Commit counts on each side of a pair.
///
/// For `classify(a, b)`: `ahead` counts commits reachable from `a` but not
/// from `b`, `behind` the reverse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub ahead: usize,
    pub behind: usize,
}

/// The four shapes a pair can be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DivergenceKind {
    Identical,
    /// Fast-forward from the other side is possible.
    Ahead,
    Behind,
    Forked,
}

impl Divergence {
    #[must_use]
    pub const fn kind(self) -> DivergenceKind {
        match (self.ahead, self.behind) {
            (0, 0) => DivergenceKind::Identical,
            (_, 0) => DivergenceKind::Ahead,
            (0, _) => DivergenceKind::Behind,
            _ => DivergenceKind::Forked,
        }
    }

    /// The same divergence seen from the other side.
    #[must_use]
    pub const fn flip(self) -> Self {
        Self {
            ahead: self.behind,
            behind: self.ahead,
        }
    }
}

/// Count commits on each side of `a` and `b`.
///
/// # Errors
/// Propagates backend failures.
pub fn classify(repo: &dyn GitRepo, a: GitOid, b: GitOid) -> Result<Divergence, GitError> {
    if a == b {
        return Ok(Divergence::default());
    }
    Ok(Divergence {
        ahead: repo.commits_between(b, a)?.len(),
        behind: repo.commits_between(a, b)?.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trisync_git::MemoryRepo;

    #[test]
    fn kinds() {
        let d = |ahead, behind| Divergence { ahead, behind }.kind();
        assert_eq!(d(0, 0), DivergenceKind::Identical);
        assert_eq!(d(3, 0), DivergenceKind::Ahead);
        assert_eq!(d(0, 2), DivergenceKind::Behind);
        assert_eq!(d(1, 1), DivergenceKind::Forked);
    }

    #[test]
    fn linear_history() {
        let repo = MemoryRepo::new("feature", "main");
        let root = repo.branch_tip("feature").unwrap();
        repo.commit_file("a", "1", "a");
        let tip = repo.commit_file("b", "1", "b");
        assert_eq!(
            classify(&repo, tip, root).unwrap(),
            Divergence { ahead: 2, behind: 0 }
        );
        assert_eq!(classify(&repo, root, tip).unwrap().kind(), DivergenceKind::Behind);
        assert_eq!(classify(&repo, tip, tip).unwrap().kind(), DivergenceKind::Identical);
    }

    #[test]
    fn forked_history() {
        let repo = MemoryRepo::new("feature", "main");
        let ours = repo.commit_file("a", "1", "a");
        let theirs = repo.remote_commit("main", "main", "b", "1", "b");
        let d = classify(&repo, ours, theirs).unwrap();
        assert_eq!(d, Divergence { ahead: 1, behind: 1 });
        assert_eq!(d.kind(), DivergenceKind::Forked);
    }

    /// A random DAG: commit `i` has one or two parents among `0..i`.
    fn arb_dag() -> impl Strategy<Value = Vec<(usize, Option<usize>)>> {
        (2usize..14).prop_flat_map(|n| {
            (1..n)
                .map(|i| (0..i, proptest::option::of(0..i)))
                .collect::<Vec<_>>()
        })
    }

    fn build(dag: &[(usize, Option<usize>)]) -> (MemoryRepo, Vec<GitOid>) {
        let repo = MemoryRepo::new("feature", "main");
        let mut oids = vec![repo.branch_tip("feature").unwrap()];
        for (i, (first, second)) in dag.iter().enumerate() {
            let mut parents = vec![oids[*first]];
            if let Some(s) = second
                && s != first
            {
                parents.push(oids[*s]);
            }
            let path = format!("f{i}");
            oids.push(repo.raw_commit(&parents, &[(path.as_str(), "x")], &path));
        }
        (repo, oids)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn classify_is_symmetric(dag in arb_dag(), picks in (0usize..64, 0usize..64)) {
            let (repo, oids) = build(&dag);
            let a = oids[picks.0 % oids.len()];
            let b = oids[picks.1 % oids.len()];
            let ab = classify(&repo, a, b).unwrap();
            let ba = classify(&repo, b, a).unwrap();
            prop_assert_eq!(ab.ahead, ba.behind);
            prop_assert_eq!(ab.behind, ba.ahead);
            prop_assert_eq!(ab.flip(), ba);
            prop_assert_eq!(ab.kind() == DivergenceKind::Identical, a == b);
        }
    }
}
