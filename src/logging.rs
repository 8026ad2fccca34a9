//! # Observability & Tracing
//!
//! Tracing bootstrap for embedders and tests. The server core itself only
//! emits `tracing` events (store operations at debug, handled requests at
//! info when the executor's logging flag is on, handler failures at warn);
//! installing a subscriber is the host application's call, and this helper
//! is the one-liner for it.
//!
//! The log level comes from `RUST_LOG` (default `info`). The compact format
//! hides the crate/module prefix to keep lines short while keeping the
//! structured fields.

use tracing_subscriber::EnvFilter;

/// Initializes a compact tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops, which lets every
/// test set it up without coordination.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
