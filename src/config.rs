//! Runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Output format of the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
  /// Budget of a single operation to acquire its accounts and stage its changes.
  pub operation_timeout: Duration,
  /// Number of entries fetched at a time when walking the history of an account.
  pub history_page_size: usize,
  /// Where to export the transaction history after processing, if anywhere.
  pub history_path: Option<PathBuf>,
  /// Log format.
  pub log_format: LogFormat,
  /// Log filter used when `RUST_LOG` is not set.
  pub log_filter: String,
}

impl Default for LedgerConfig {
  fn default() -> Self {
    Self {
      operation_timeout: Duration::from_secs(5),
      history_page_size: 50,
      history_path: None,
      log_format: LogFormat::Text,
      log_filter: "info".to_string(),
    }
  }
}

impl LedgerConfig {
  /// Load configuration from environment variables.
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  fn from_lookup<F>(lookup: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();

    if let Some(millis) = lookup("LEDGER_OPERATION_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
      config.operation_timeout = Duration::from_millis(millis);
    }

    if let Some(size) = lookup("LEDGER_HISTORY_PAGE_SIZE").and_then(|v| v.parse().ok()) {
      config.history_page_size = size;
    }

    if let Some(path) = lookup("LEDGER_HISTORY_PATH").filter(|v| !v.is_empty()) {
      config.history_path = Some(PathBuf::from(path));
    }

    if let Some(format) = lookup("LEDGER_LOG_FORMAT") {
      if format.eq_ignore_ascii_case("json") {
        config.log_format = LogFormat::Json;
      }
    }

    if let Some(level) = lookup("LOG_LEVEL") {
      config.log_filter = level;
    }

    config
  }

  /// Validate configuration.
  pub fn validate(&self) -> Result<(), String> {
    if self.operation_timeout == Duration::ZERO {
      return Err("Operation timeout cannot be 0".to_string());
    }

    if self.history_page_size == 0 {
      return Err("History page size cannot be 0".to_string());
    }

    Ok(())
  }
}
