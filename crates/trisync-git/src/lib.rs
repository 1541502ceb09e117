//! Git abstraction layer for trisync.
//!
//! This crate defines the [`GitRepo`] trait, the only interface through which
//! the reconciliation engine touches a repository. The engine never imports
//! gix or spawns `git` itself; it programs against the trait.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`types`]: value types used in trait signatures ([`GitOid`],
//!   [`BranchName`], [`PushMode`], [`PushOutcome`], etc.).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.
//! - [`memory`]: [`MemoryRepo`], an in-memory repository plus remote for
//!   tests.
//!
//! [`GixRepo`] is the production implementation.

pub mod error;
pub mod memory;
pub mod repo;
pub mod types;

mod cmd;
mod gix_repo;
mod refs_impl;
mod remote_impl;
mod rewrite_impl;
mod stash_impl;
mod status_impl;

pub use gix_repo::GixRepo;
pub use memory::MemoryRepo;

pub use error::GitError;
pub use repo::GitRepo;
pub use types::{
    BranchName, BranchNameError, CommitInfo, FetchOptions, GitOid, OidParseError,
    PendingOperation, PullOptions, PushMode, PushOutcome, ResetMode, RewriteOutcome,
};
