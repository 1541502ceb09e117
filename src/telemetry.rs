//! Diagnostic logging initialization.
//!
//! Controlled by two environment variables:
//! - `TRISYNC_LOG`: an `EnvFilter` directive (falls back to `RUST_LOG`, then
//!   `warn`).
//! - `TRISYNC_LOG_FORMAT=json`: JSON lines with span close events instead of
//!   the compact human format.
//!
//! Output always goes to stderr; stdout carries the operator-facing event
//! stream and `status --format json`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const FILTER_VAR: &str = "TRISYNC_LOG";
const FORMAT_VAR: &str = "TRISYNC_LOG_FORMAT";
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Call once, first thing in `main`.
pub fn init() {
    let filter = filter_directive(
        std::env::var(FILTER_VAR).ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let filter = EnvFilter::try_new(&filter).unwrap_or_else(|e| {
        eprintln!("warning: invalid {FILTER_VAR} directive '{filter}': {e}");
        EnvFilter::new(DEFAULT_FILTER)
    });

    let json = std::env::var(FORMAT_VAR).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn filter_directive(own: Option<String>, rust_log: Option<String>) -> String {
    own.filter(|v| !v.is_empty())
        .or_else(|| rust_log.filter(|v| !v.is_empty()))
        .unwrap_or_else(|| DEFAULT_FILTER.to_owned())
}
