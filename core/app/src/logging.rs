//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize process-wide logging.
///
/// Honors `RUST_LOG` when set; falls back to `info` (or `debug` when
/// `verbose`). Later calls are no-ops.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
