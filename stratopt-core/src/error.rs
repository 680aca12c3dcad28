//! Structured error types for the core crate.
//!
//! These are designed to be displayable in both CLI and TUI contexts.

use thiserror::Error;

use crate::params::ParamName;

/// Why a `{min, max, step}` range could not be expanded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("step must be non-zero")]
    ZeroStep,

    #[error("range bounds and step must be finite (min={min}, max={max}, step={step})")]
    NonFinite { min: f64, max: f64, step: f64 },

    #[error("range is inverted: min={min} max={max} step={step}")]
    InvertedRange { min: f64, max: f64, step: f64 },

    #[error("range expands to {count} points (limit {limit})")]
    TooManyPoints { count: u64, limit: usize },

    #[error("{param}: {source}")]
    Param {
        param: ParamName,
        #[source]
        source: Box<GridError>,
    },
}

impl GridError {
    /// Attach the parameter name to a range error.
    pub fn for_param(self, param: ParamName) -> Self {
        GridError::Param {
            param,
            source: Box::new(self),
        }
    }
}

/// Settings persistence failures.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Chart export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
}
