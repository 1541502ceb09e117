//! trisync library crate.
//!
//! The primary interface is the `trisync` binary. The library exposes the
//! reconciliation engine and its collaborators so integration tests can drive
//! them against real repositories with scripted confirmations.
//!
//! Layering, bottom up: [`classify`] and [`decision`] are pure; [`model`]
//! reads the branch triple through a [`trisync_git::GitRepo`]; [`engine`]
//! executes decisions; [`commands`] holds the thin commands around it.

pub mod classify;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod decision;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;

pub use decision::{ManualResolution, SyncDecision};
pub use engine::Engine;
pub use error::{Precondition, SyncError};
pub use model::Session;
