//! Repository configuration (`.trisync.toml`).
//!
//! Optional file at the root of the working tree. Every field has a default,
//! so a missing file (or an empty one) is a valid configuration.
//!
//! ```toml
//! [remote]
//! name = "origin"
//! integration = ["master", "main"]
//!
//! [fetch]
//! prune = true
//! tags = true
//!
//! [commit]
//! message = "update"
//! squash_message = "squash"
//! rebase_squash_message = "rebase"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use trisync_git::FetchOptions;

/// File name looked up at the work-tree root.
pub const FILE_NAME: &str = ".trisync.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level trisync configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrisyncConfig {
    /// Which remote to talk to and which of its branches is the trunk.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Fetch behaviour.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Default commit messages.
    #[serde(default)]
    pub commit: CommitConfig,
}

// ---------------------------------------------------------------------------
// RemoteConfig
// ---------------------------------------------------------------------------

/// Remote selection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Remote holding both the operator's published branch and the
    /// integration branch (default: `"origin"`).
    #[serde(default = "default_remote")]
    pub name: String,

    /// Integration branch candidates; the first one the remote has wins.
    #[serde(default = "default_integration")]
    pub integration: Vec<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            name: default_remote(),
            integration: default_integration(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_owned()
}

fn default_integration() -> Vec<String> {
    vec!["master".to_owned(), "main".to_owned()]
}

// ---------------------------------------------------------------------------
// FetchConfig
// ---------------------------------------------------------------------------

/// Options passed to every fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Drop remote-tracking refs (and tags) that vanished upstream.
    #[serde(default = "default_true")]
    pub prune: bool,

    /// Fetch tags.
    #[serde(default = "default_true")]
    pub tags: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            prune: true,
            tags: true,
        }
    }
}

impl FetchConfig {
    /// The backend options these settings translate to.
    #[must_use]
    pub const fn options(self) -> FetchOptions {
        FetchOptions {
            prune: self.prune,
            tags: self.tags,
        }
    }
}

const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// CommitConfig
// ---------------------------------------------------------------------------

/// Default messages for the commits trisync authors.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitConfig {
    /// `trisync commit` without `-m`.
    #[serde(default = "default_commit_message")]
    pub message: String,

    /// `trisync squash` without `-m`.
    #[serde(default = "default_squash_message")]
    pub squash_message: String,

    /// The single commit produced when a conflicting rebase is squashed and
    /// retried.
    #[serde(default = "default_rebase_squash_message")]
    pub rebase_squash_message: String,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            message: default_commit_message(),
            squash_message: default_squash_message(),
            rebase_squash_message: default_rebase_squash_message(),
        }
    }
}

fn default_commit_message() -> String {
    "update".to_owned()
}

fn default_squash_message() -> String {
    "squash".to_owned()
}

fn default_rebase_squash_message() -> String {
    "rebase".to_owned()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl TrisyncConfig {
    /// Load `.trisync.toml` from the work-tree root `dir`.
    ///
    /// # Errors
    /// See [`load`](Self::load).
    pub fn load_from_workdir(dir: &Path) -> Result<Self, ConfigError> {
        Self::load(&dir.join(FILE_NAME))
    }

    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found), parse
    /// errors, or an empty integration candidate list.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML, unknown fields, or an empty
    /// integration candidate list.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })?;
        if config.remote.integration.is_empty() {
            return Err(ConfigError {
                path: None,
                message: "remote.integration must name at least one branch".to_owned(),
            });
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = TrisyncConfig::default();
        assert_eq!(cfg.remote.name, "origin");
        assert_eq!(cfg.remote.integration, vec!["master", "main"]);
        assert!(cfg.fetch.prune);
        assert!(cfg.fetch.tags);
        assert_eq!(cfg.commit.message, "update");
        assert_eq!(cfg.commit.squash_message, "squash");
        assert_eq!(cfg.commit.rebase_squash_message, "rebase");
    }

    #[test]
    fn parse_empty_string() {
        let cfg = TrisyncConfig::parse("").unwrap();
        assert_eq!(cfg, TrisyncConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[remote]
name = "upstream"
integration = ["trunk"]

[fetch]
prune = false
tags = false

[commit]
message = "wip"
squash_message = "feature"
rebase_squash_message = "rebased"
"#;
        let cfg = TrisyncConfig::parse(toml).unwrap();
        assert_eq!(cfg.remote.name, "upstream");
        assert_eq!(cfg.remote.integration, vec!["trunk"]);
        assert_eq!(
            cfg.fetch.options(),
            FetchOptions {
                prune: false,
                tags: false
            }
        );
        assert_eq!(cfg.commit.message, "wip");
        assert_eq!(cfg.commit.squash_message, "feature");
        assert_eq!(cfg.commit.rebase_squash_message, "rebased");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = TrisyncConfig::parse("[fetch]\ntags = false\n").unwrap();
        assert!(cfg.fetch.prune);
        assert!(!cfg.fetch.tags);
        assert_eq!(cfg.remote, RemoteConfig::default());
    }

    #[test]
    fn unknown_field_reports_line() {
        let err = TrisyncConfig::parse("[remote]\nname = \"origin\"\nbogus = 1\n").unwrap_err();
        assert!(err.message.contains("line 3"), "{}", err.message);
        assert!(err.message.contains("bogus"), "{}", err.message);
    }

    #[test]
    fn empty_integration_list_is_rejected() {
        let err = TrisyncConfig::parse("[remote]\nintegration = []\n").unwrap_err();
        assert!(err.message.contains("integration"));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrisyncConfig::load_from_workdir(dir.path()).unwrap();
        assert_eq!(cfg, TrisyncConfig::default());
    }

    #[test]
    fn load_error_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FILE_NAME), "[remote\n").unwrap();
        let err = TrisyncConfig::load_from_workdir(dir.path()).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(dir.path().join(FILE_NAME).as_path()));
        assert!(err.to_string().contains(FILE_NAME));
    }
}
