//! Structured logging for the histogram pipeline.
//!
//! Thin initialization layer over `tracing-subscriber`. Modules emit
//! events through the `tracing` macros with source/chunk context fields;
//! this only wires up the subscriber once per process.

use tracing_subscriber::EnvFilter;

/// Initializes console logging at `info` level, honoring `RUST_LOG`
/// overrides. Safe to call more than once; later calls are no-ops.
pub fn init() {
    init_with_default("info");
}

/// Initializes console logging with an explicit default filter, e.g.
/// `"rainhist=debug"`. `RUST_LOG` still takes precedence when set.
pub fn init_with_default(directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
