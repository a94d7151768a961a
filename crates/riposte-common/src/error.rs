//! Error types for Riposte.

use thiserror::Error;

/// Top-level error type for Riposte operations.
///
/// Combat resolution itself never fails; these errors come from checking the
/// schema version of the data that configures it.
#[derive(Debug, Error)]
pub enum RiposteError {
    /// Malformed version string
    #[error("Invalid version string: {0:?}")]
    InvalidVersion(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Result type alias for Riposte operations.
pub type RiposteResult<T> = Result<T, RiposteError>;
