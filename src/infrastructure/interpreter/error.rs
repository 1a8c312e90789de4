//! Typed errors for the interpretation backend adapter.

use thiserror::Error;

/// Errors from the interpretation service transport.
///
/// The engine never retries on its own; `is_transient` exists so the
/// hosting UI can decide whether to offer a retry.
#[derive(Error, Debug)]
pub enum InterpreterApiError {
    /// Invalid request parameters or malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed due to an invalid or missing API key
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Backend is rate limiting this client
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Backend encountered an internal error
    #[error("Interpretation server error: {0}")]
    ServerError(String),

    /// Backend is overloaded
    #[error("Interpretation server overloaded")]
    Overloaded,

    /// Network error during the request
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body was not the expected JSON shape
    #[error("Malformed interpretation response: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request timed out waiting for a response
    #[error("Timeout waiting for interpretation")]
    Timeout,

    /// Anything else
    #[error("Unexpected response: HTTP {status}: {body}")]
    Unexpected { status: u16, body: String },
}

impl InterpreterApiError {
    /// True when a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError(_) | Self::Overloaded | Self::Timeout
        )
    }

    /// Map a non-2xx HTTP response to an error variant, keeping the body
    /// as the message so it reaches the human verbatim.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 => Self::InvalidRequest(body),
            401 | 403 => Self::AuthenticationFailed(body),
            429 => Self::RateLimited,
            529 => Self::Overloaded,
            500..=599 => Self::ServerError(body),
            code => Self::Unexpected { status: code, body },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            InterpreterApiError::from_status(StatusCode::BAD_REQUEST, "bad".into()),
            InterpreterApiError::InvalidRequest(_)
        ));
        assert!(matches!(
            InterpreterApiError::from_status(StatusCode::UNAUTHORIZED, "key".into()),
            InterpreterApiError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            InterpreterApiError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            InterpreterApiError::RateLimited
        ));
        assert!(matches!(
            InterpreterApiError::from_status(StatusCode::from_u16(529).unwrap(), String::new()),
            InterpreterApiError::Overloaded
        ));
        assert!(matches!(
            InterpreterApiError::from_status(StatusCode::BAD_GATEWAY, "down".into()),
            InterpreterApiError::ServerError(_)
        ));
        assert!(matches!(
            InterpreterApiError::from_status(StatusCode::IM_A_TEAPOT, "tea".into()),
            InterpreterApiError::Unexpected { status: 418, .. }
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(InterpreterApiError::RateLimited.is_transient());
        assert!(InterpreterApiError::Timeout.is_transient());
        assert!(InterpreterApiError::ServerError("boom".into()).is_transient());
        assert!(!InterpreterApiError::InvalidRequest("nope".into()).is_transient());
        assert!(!InterpreterApiError::AuthenticationFailed("key".into()).is_transient());
    }

    #[test]
    fn test_body_reaches_message_verbatim() {
        let err = InterpreterApiError::from_status(
            StatusCode::BAD_REQUEST,
            "instruction must not be empty".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "Invalid request: instruction must not be empty"
        );
    }
}
