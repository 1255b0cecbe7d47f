//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

use crate::config::{LedgerConfig, LogFormat};

/// Initialize tracing/logging for the process.
///
/// Logs go to stderr so stdout only carries the report. `RUST_LOG` takes precedence over the
/// configured filter. Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: &LedgerConfig) {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false);

  let _ = match config.log_format {
    LogFormat::Json => builder.json().try_init(),
    LogFormat::Text => builder.try_init(),
  };
}
