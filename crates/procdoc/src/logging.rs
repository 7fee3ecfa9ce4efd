//! Logging setup.
//!
//! The crate mixes `tracing` spans (pipeline stages) with `log` macros
//! (store and db layers); `init` installs a subscriber that renders both.

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber, filtered by `RUST_LOG`
/// (defaulting to `info`), and bridges `log` records into it. Safe to
/// call more than once; later calls are no-ops.
pub fn init() {
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
