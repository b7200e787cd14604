//! Unified error type for counter construction, correction and restore.
//!
//! The same error type is shared by every counter kind, so client code can
//! switch between kinds without changing its error handling.

use thiserror::Error;

/// Unified error type for all counter operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    /// Bad construction or correction parameters. Surfaced to the caller
    /// immediately; never retried internally.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A normalization or correction step would push the year count past
    /// the representable range. The operation is rejected and the prior
    /// state is left untouched.
    #[error("calendar overflow: year count exceeds the representable range")]
    Overflow,

    /// A restored counter disagrees with its own invariants (mode
    /// incompatible with the concrete kind, magnitudes inconsistent with
    /// the overflow latch, ...). The restored object is rejected wholesale.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
}

/// Result type for counter operations.
pub type Result<T> = std::result::Result<T, CounterError>;
