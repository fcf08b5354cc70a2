//! Error types for muscle model construction and evaluation.

use thiserror::Error;

/// Errors that can occur when configuring or querying a muscle.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MuscleError {
    /// A parameter is outside its documented validity range.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Human-readable range requirement.
        reason: &'static str,
    },

    /// The operation is not meaningful for this muscle model.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The requested state slot does not exist for this muscle's configuration.
    #[error("state variable `{0}` does not exist for this muscle")]
    MissingState(&'static str),

    /// A legacy muscle type has no mapping onto this model.
    #[error("muscle '{name}' of type {kind} is unsupported and unsupported muscles are not allowed")]
    UnsupportedLegacyMuscle {
        /// Name of the legacy muscle.
        name: String,
        /// Type name of the legacy muscle.
        kind: String,
    },
}

impl MuscleError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

/// Result type for muscle operations.
pub type Result<T> = std::result::Result<T, MuscleError>;
