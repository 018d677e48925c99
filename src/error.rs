//! Error types of the crate.
use thiserror::Error;

/// Errors reported by configuration validation and training routines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SvmError {
    /// A configuration value is outside its admissible range.
    /// Detected before any optimization step is taken.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Inputs do not fit together (lengths, shapes).
    #[error("data mismatch: {0}")]
    DataMismatch(String),

    /// The solver hit its step or time limit before reaching the
    /// requested tolerance.
    #[error("no convergence after {steps} steps (violation {violation:.6e})")]
    NonConvergence {
        /// Number of steps conducted before giving up.
        steps: usize,
        /// Remaining violation of the optimality conditions.
        violation: f64,
    },

    /// Training was aborted through the cancellation callback.
    #[error("training canceled by callback")]
    Canceled,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SvmError>;
