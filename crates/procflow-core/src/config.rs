//! Engine configuration
//!
//! Loaded from TOML. Every section and key is optional:
//!
//! ```toml
//! [logging]
//! profile = "production"
//!
//! [transaction]
//! trace_begin = true
//!
//! [operations]
//! audit = true
//! ```

use crate::errors::{FlowError, Result};
use crate::logging_facility::Profile;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub transaction: TransactionConfig,
    pub operations: OperationConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionConfig {
    /// Capture a backtrace when a transaction scope opens; it is reported
    /// when a nested `begin` is attempted on the same context.
    pub trace_begin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationConfig {
    /// Emit one audit event per executed operation
    pub audit: bool,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self { audit: true }
    }
}

impl EngineConfig {
    /// Parse a configuration document
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the document is not valid TOML or carries
    /// unknown keys.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FlowError::Configuration {
            reason: e.to_string(),
        })
    }

    /// Read and parse a configuration file
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the file cannot be read or parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| FlowError::Configuration {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&raw)
    }
}
