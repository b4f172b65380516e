//! # Kernel Configuration
//!
//! `KernelConfig` is read from a TOML file; every field has a default so a
//! missing file section is never an error.
//!
//! ```toml
//! lock_timeout_ms = 5000
//! log_directory = "data/transactions"
//! log_file_prefix = "txlog"
//! strict_log_headers = true
//! ```

use crate::KestrelError;
use crate::primitives::{DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_LOG_FILE_PREFIX};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables of the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    /// How long a transaction waits for an exclusive entity lock.
    pub lock_timeout_ms: u64,
    /// Directory holding the transaction log segments.
    pub log_directory: PathBuf,
    /// File name prefix of log segments (`<prefix>.<version>`).
    pub log_file_prefix: String,
    /// Whether a short header read is fatal when inspecting segments.
    pub strict_log_headers: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            log_directory: PathBuf::from("transactions"),
            log_file_prefix: DEFAULT_LOG_FILE_PREFIX.to_string(),
            strict_log_headers: true,
        }
    }
}

impl KernelConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, KestrelError> {
        toml::from_str(text).map_err(|e| KestrelError::ConfigError(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KestrelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            KestrelError::ConfigError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Lock timeout as a `Duration`.
    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
