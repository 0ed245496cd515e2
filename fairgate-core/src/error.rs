//! Error taxonomy for booking operations.

use thiserror::Error;

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error taxonomy shared across the coordinator, the finalize worker
/// and the stores.
///
/// The synchronous path surfaces `Validation` and `NotFound` to the
/// client; `Transient` failures are retried by the worker through
/// non-acknowledgement; `Fatal` messages go to the dead-letter topic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Bad input: oversize booking, empty seat list, expired event.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The operation conflicts with current state (e.g. a requested
    /// seat is no longer available, or a finalize raced a cancel).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Admission refused: the event has no remaining inventory.
    /// Translated to a waitlist response, never surfaced as an error.
    #[error("event is at capacity")]
    CapacityFull,

    /// Infrastructure failure that is expected to succeed on retry:
    /// ledger contention, stream publish failure, notification failure.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Unrecoverable failure, e.g. a malformed finalize message.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl CoreError {
    /// `true` when a retry can reasonably be expected to succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// `true` when the error is caused by the caller's input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Conflict(_)
        )
    }

    /// Shorthand for a transient database error.
    #[must_use]
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Transient(format!("database: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CoreError::Transient("kafka down".into()).is_transient());
        assert!(!CoreError::CapacityFull.is_transient());
        assert!(!CoreError::Fatal("bad payload".into()).is_transient());
    }

    #[test]
    fn client_error_classification() {
        assert!(CoreError::Validation("too many seats".into()).is_client_error());
        assert!(CoreError::NotFound("booking").is_client_error());
        assert!(!CoreError::Transient("db".into()).is_client_error());
    }

    #[test]
    fn display_includes_context() {
        let err = CoreError::NotFound("event");
        assert_eq!(err.to_string(), "event not found");
    }
}
