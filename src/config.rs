//! Activation gate and process configuration
//!
//! Two independent switches decide whether timing records are written:
//!
//! - `BT_INIT` (presence only) enables instrumentation. It is read once, when
//!   the process-wide strategy is resolved, so a disabled process pays only for
//!   a call into the no-op strategy.
//! - `BT_DISABLED` is read on every `start`/`end`. It suppresses side effects
//!   when present with any value other than `"0"`.
//!
//! `BT_DIR` optionally moves the record directory away from the shared temp
//! directory.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Environment variable whose presence enables instrumentation
pub const INIT_VAR: &str = "BT_INIT";

/// Environment variable that suppresses instrumentation per call
pub const DISABLED_VAR: &str = "BT_DISABLED";

/// Environment variable overriding the record directory
pub const DIR_VAR: &str = "BT_DIR";

/// Process configuration for timing records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether real start/end behavior is on for this process
    pub enabled: bool,
    /// Directory holding start, alias, and session records
    pub record_dir: PathBuf,
    /// Variable consulted on every call for runtime suppression
    pub disable_var: String,
}

impl Config {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Self {
        let record_dir = std::env::var_os(DIR_VAR)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_record_dir);

        Self {
            enabled: std::env::var_os(INIT_VAR).is_some(),
            record_dir,
            disable_var: DISABLED_VAR.to_string(),
        }
    }

    /// Enable or disable instrumentation
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Write records under `dir`
    pub fn with_record_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.record_dir = dir.into();
        self
    }

    /// Consult `var` instead of `BT_DISABLED` for runtime suppression
    pub fn with_disable_var(mut self, var: impl Into<String>) -> Self {
        self.disable_var = var.into();
        self
    }

    pub fn record_dir(&self) -> &Path {
        &self.record_dir
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            record_dir: default_record_dir(),
            disable_var: DISABLED_VAR.to_string(),
        }
    }
}

/// Runtime gate: reads `var` now, on every call
pub fn runtime_disabled(var: &str) -> bool {
    is_disabling(std::env::var_os(var).as_deref())
}

/// A disable flag only disables when present and not exactly `"0"`
pub fn is_disabling(value: Option<&OsStr>) -> bool {
    matches!(value, Some(v) if v != "0")
}

#[cfg(unix)]
fn default_record_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

#[cfg(not(unix))]
fn default_record_dir() -> PathBuf {
    std::env::temp_dir()
}
