use thiserror::Error;

/// Errors returned by the scoring, clustering, and alignment routines in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Input is empty where at least one item is required.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// A prior, matrix, or data point has the wrong dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// The run was stopped through a [`CancellationToken`](crate::CancellationToken).
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
