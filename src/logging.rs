//! Global logging for host processes

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this twice
/// keeps the first subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_line_number(false)
        .try_init();
}
