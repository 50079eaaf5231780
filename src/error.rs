//! Domain error taxonomy
//!
//! Engine operations return `Result<T, MarketError>` so callers can branch
//! on the failure class without exception handling. Unexpected conditions
//! collapse into `Storage` and are surfaced with a generic message at the
//! API boundary; internal error text never reaches clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    /// Malformed request shape, rejected before any I/O. User-correctable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The profile/need/conversation does not exist. Distinct so callers
    /// can render an empty or onboarding state instead of a generic error.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller lacks the required role. The message is deliberately generic
    /// and never reveals whether the target resource exists.
    #[error("unauthorized")]
    Unauthorized,

    /// A domain invariant would be violated (e.g. duplicate application).
    #[error("{0}")]
    Conflict(String),

    /// The scoring oracle timed out or returned an overload/5xx response.
    /// Surfaced to users as retryable, distinct from programming errors.
    #[error("scoring service is busy, try again: {0}")]
    OracleUnavailable(String),

    /// Unexpected persistence or infrastructure failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl MarketError {
    /// True for failures the caller may meaningfully retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OracleUnavailable(_))
    }
}

pub type Result<T, E = MarketError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_message_is_generic() {
        let err = MarketError::Unauthorized;
        assert_eq!(err.to_string(), "unauthorized");
    }

    #[test]
    fn test_oracle_unavailable_is_retryable() {
        assert!(MarketError::OracleUnavailable("timeout".into()).is_retryable());
        assert!(!MarketError::NotFound("need".into()).is_retryable());
    }
}
