//! Diagnostics for the orchestrator.
//!
//! Tracing output goes to stderr and is controlled by `RUST_LOG`. It is separate
//! from command output on stdout (JSON results), which is unaffected by filters.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `warn`. Compact format on stderr.
///
/// ```bash
/// RUST_LOG=turn_runner=debug turn-runner run --turns 2
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
