//! Structured progress events and their presentation.
//!
//! The engine never prints. It emits [`Event`] records into an
//! [`EventSink`]; the binary renders them with [`Console`], tests collect
//! them with [`Recorder`]. Every event is also mirrored to `tracing` at the
//! matching level so `TRISYNC_LOG=debug` shows the same story interleaved
//! with backend calls.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;

/// The operation an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Op {
    Sync,
    Fetch,
    Push,
    Pull,
    Fork,
    Rebase,
    Squash,
    ForcePush,
    Reset,
    Commit,
    Stash,
    Submodule,
    Abort,
    Status,
}

impl Op {
    /// Glyph prefixed to console lines.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Sync => "🔄️",
            Self::Fetch => "🔃",
            Self::Push => "🔼",
            Self::Pull => "🔽",
            Self::Fork => "🍴",
            Self::Rebase => "🌳",
            Self::Squash => "🧹",
            Self::ForcePush => "⏫",
            Self::Reset => "🪓",
            Self::Commit => "💾",
            Self::Stash => "📁",
            Self::Submodule => "📦",
            Self::Abort => "🛑",
            Self::Status => "🔎",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sync => "Sync",
            Self::Fetch => "Fetch",
            Self::Push => "Push",
            Self::Pull => "Pull",
            Self::Fork => "Fork",
            Self::Rebase => "Rebase",
            Self::Squash => "Squash",
            Self::ForcePush => "Force-Push",
            Self::Reset => "Reset",
            Self::Commit => "Commit",
            Self::Stash => "Stash",
            Self::Submodule => "Submodule-Update",
            Self::Abort => "Abort",
            Self::Status => "Status",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Event severity / phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Info,
    Warn,
    Fail,
    End,
}

/// One progress record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Event {
    pub op: Op,
    pub kind: EventKind,
    pub message: String,
}

impl Event {
    #[must_use]
    pub fn new(op: Op, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            op,
            kind,
            message: message.into(),
        }
    }

    fn trace(&self) {
        let op = self.op.label();
        match self.kind {
            EventKind::Start | EventKind::End => {
                tracing::debug!(op, kind = ?self.kind, "{}", self.message);
            }
            EventKind::Info => tracing::info!(op, "{}", self.message),
            EventKind::Warn => tracing::warn!(op, "{}", self.message),
            EventKind::Fail => tracing::error!(op, "{}", self.message),
        }
    }
}

/// Consumer of engine events.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    /// Whether an event of `kind` whose message contains `needle` was seen.
    #[must_use]
    pub fn saw(&self, kind: EventKind, needle: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.kind == kind && e.message.contains(needle))
    }

    /// All events of `kind`.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<&Event> {
        self.events.iter().filter(|e| e.kind == kind).collect()
    }
}

impl EventSink for Recorder {
    fn emit(&mut self, event: Event) {
        event.trace();
        self.events.push(event);
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Renders events as one line each: `<glyph> <Op> START`, `<glyph> <Op>: msg`.
pub struct Console<W: Write> {
    out: W,
}

impl Console<io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> Console<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(event: &Event) -> String {
        let glyph = event.op.glyph();
        let label = event.op.label();
        match event.kind {
            EventKind::Start if event.message.is_empty() => format!("{glyph} {label} START"),
            EventKind::End if event.message.is_empty() => format!("{glyph} {label} END"),
            EventKind::Start | EventKind::End | EventKind::Info => {
                format!("{glyph} {label}: {}", event.message)
            }
            EventKind::Warn => format!("🚨 {label}: {}", event.message),
            EventKind::Fail => format!("💥 {label}: {}", event.message),
        }
    }
}

impl<W: Write> EventSink for Console<W> {
    fn emit(&mut self, event: Event) {
        event.trace();
        // A closed stdout must not abort a half-finished git operation.
        if let Err(e) = writeln!(self.out, "{}", Self::render(&event)) {
            tracing::debug!(error = %e, "failed to write event");
        }
    }
}
