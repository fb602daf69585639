//! Tracing subscriber set-up for hosting applications.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a formatted subscriber filtered by `RUST_LOG`, falling back to
/// the configured level. A second call is a no-op.
pub fn init(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
