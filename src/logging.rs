//! Logging initialization for embedding applications.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Intended to be called once by the embedding GUI shell at startup.
/// Respects `RUST_LOG`; defaults to `info` when unset. Subsequent calls
/// are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
