//! Error types for oasis-server

use hyper::StatusCode;
use thiserror::Error;

/// Server error type
#[derive(Error, Debug)]
pub enum ServerError {
    /// Rejection or failure reported by the engine
    #[error(transparent)]
    Engine(#[from] oasis_core::Error),

    #[error("storage error: {0}")]
    Storage(#[from] oasis_db::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid route pattern: {0}")]
    Route(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ServerError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Engine(oasis_core::Error::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServerError::Engine(e) if e.is_rejection() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for the response body
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Engine(e) => e.code(),
            _ => "internal_error",
        }
    }
}

/// Shorthand for a malformed request
pub(crate) fn invalid(msg: impl Into<String>) -> ServerError {
    ServerError::Engine(oasis_core::Error::Validation(msg.into()))
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use oasis_core::Error;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::profile_not_found("u1"), StatusCode::NOT_FOUND),
            (Error::building_not_found("b"), StatusCode::NOT_FOUND),
            (Error::QueueBusy, StatusCode::BAD_REQUEST),
            (Error::SlotOccupied(3), StatusCode::BAD_REQUEST),
            (Error::MaxLevelReached { max_level: 5 }, StatusCode::BAD_REQUEST),
            (Error::Validation("x".into()), StatusCode::BAD_REQUEST),
            (Error::Repository("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn test_codes_pass_through() {
        assert_eq!(ServerError::from(Error::QueueBusy).code(), "queue_busy");
        assert_eq!(invalid("bad").code(), "validation_error");
        assert_eq!(
            ServerError::Config("x".into()).code(),
            "internal_error"
        );
    }
}
