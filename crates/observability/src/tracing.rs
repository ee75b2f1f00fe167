//! Tracing/logging initialization.
//!
//! Rule decisions are emitted at `debug` under the `groupclaim_mapper` target,
//! so operators troubleshooting a silent mapper typically run with
//! `RUST_LOG=info,groupclaim_mapper=debug`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_default_filter(DEFAULT_FILTER);
}

/// Like [`init`], but with a caller-supplied filter used when `RUST_LOG` is unset.
pub fn init_with_default_filter(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}

/// Human-readable output captured by the test harness.
///
/// Defaults to `debug` for the mapper crate so failing tests show why a rule
/// did not fire.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,groupclaim_mapper=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
