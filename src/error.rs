//! Error handling for dataset synthesis
//!
//! This module provides:
//! - `ConfigError` for every eagerly-detected configuration problem
//! - `SimError`, the crate-wide error returned by fallible operations
//! - Stable error codes and categories for metrics and CLI exit reporting

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = SimError> = std::result::Result<T, E>;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable numeric error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// A distribution, range or reference table is invalid
    ConfigurationError = -33001,
    /// Generated data violates a structural invariant
    IntegrityError = -33002,
    /// Reference workbook could not be read or interpreted
    WorkbookError = -33003,
    /// File I/O error
    IoError = -33004,
    /// Serialization or parsing failure
    SerializationError = -33005,
    /// Requested export format is not supported
    UnsupportedFormat = -33006,
}

impl ErrorCode {
    /// Get the integer code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get the error category for metrics
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::ConfigurationError | ErrorCode::UnsupportedFormat => "configuration",
            ErrorCode::IntegrityError => "integrity",
            ErrorCode::WorkbookError => "reference_data",
            ErrorCode::IoError => "io_error",
            ErrorCode::SerializationError => "serialization",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// CONFIGURATION ERRORS
// =============================================================================

/// Problems detected while validating settings or compiling distributions.
///
/// All of these are raised at construction time. Sampling and generation never
/// produce a `ConfigError`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("distribution '{name}' has no segments")]
    EmptyDistribution { name: String },

    #[error("distribution '{name}' weights sum to {total}, expected 100 (±{tolerance})")]
    WeightSum {
        name: String,
        total: f64,
        tolerance: f64,
    },

    #[error("distribution '{name}' has invalid weight {weight} at segment {index}")]
    InvalidWeight {
        name: String,
        index: usize,
        weight: f64,
    },

    #[error("distribution '{name}' segment '{value}' is not numeric")]
    NonNumericSegment { name: String, value: String },

    #[error("distribution '{name}' segment '{value}' is not a resiliency grade")]
    InvalidGrade { name: String, value: String },

    #[error("distribution '{name}' segment '{value}' is not a dependency tier")]
    InvalidTier { name: String, value: String },

    #[error("segment '{0}' is malformed, expected 'weight: value'")]
    MalformedSegment(String),

    #[error("{field}: range {min}..={max} is invalid")]
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{field}: value {value} outside allowed bounds {min}..={max}")]
    OutOfBounds {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("reference table '{0}' is empty")]
    EmptyReferenceTable(&'static str),

    #[error("group count range {min}..={max} needs more ids than the pool of {pool_size}")]
    GroupPool {
        min: usize,
        max: usize,
        pool_size: usize,
    },

    #[error("system type {system_key} references unknown facility type {facility_key}")]
    UnknownFacilityType { system_key: u32, facility_key: u32 },

    #[error("dependency position '{0}' is invalid")]
    InvalidPosition(String),
}

// =============================================================================
// CRATE ERROR
// =============================================================================

/// Main error type.
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("duplicate {kind} id {id} in generation run")]
    DuplicateId { kind: &'static str, id: String },

    #[error("reference workbook error: {0}")]
    Workbook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl SimError {
    /// Classify this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SimError::Config(_) => ErrorCode::ConfigurationError,
            SimError::DuplicateId { .. } => ErrorCode::IntegrityError,
            SimError::Workbook(_) => ErrorCode::WorkbookError,
            SimError::Io(_) => ErrorCode::IoError,
            SimError::Json(_) | SimError::Yaml(_) | SimError::Toml(_) | SimError::Csv(_) => {
                ErrorCode::SerializationError
            }
            SimError::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
        }
    }

    /// Whether the error stems from configuration rather than runtime I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::ConfigurationError | ErrorCode::UnsupportedFormat
        )
    }

    /// Record this error in the global metrics.
    pub fn track(&self) {
        crate::metrics::METRICS.record_error(self.code().category());
        tracing::debug!(error_code = %self.code(), error = %self, "error recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ConfigurationError.code(), -33001);
        assert_eq!(ErrorCode::IntegrityError.code(), -33002);
        assert_eq!(ErrorCode::UnsupportedFormat.code(), -33006);
    }

    #[test]
    fn test_config_error_is_classified_as_configuration() {
        let error = SimError::from(ConfigError::EmptyReferenceTable("facility_types"));
        assert_eq!(error.code(), ErrorCode::ConfigurationError);
        assert!(error.is_configuration());
        assert_eq!(error.to_string(), "reference table 'facility_types' is empty");
    }

    #[test]
    fn test_weight_sum_message() {
        let error = ConfigError::WeightSum {
            name: "condition".to_string(),
            total: 95.0,
            tolerance: 0.01,
        };
        assert_eq!(
            error.to_string(),
            "distribution 'condition' weights sum to 95, expected 100 (±0.01)"
        );
    }

    #[test]
    fn test_io_error_category() {
        let error = SimError::from(std::io::Error::other("disk full"));
        assert_eq!(error.code().category(), "io_error");
        assert!(!error.is_configuration());
    }
}
