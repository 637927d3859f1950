//! Error types for exchange REST requests and websocket streams.

use reqwest::StatusCode;
use thiserror::Error;

/// A required field was absent or not usable as a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Errors from a single REST quote request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("exchange returned code {code}: {message}")]
    Api { code: String, message: String },

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("unusable quote: {0}")]
    InvalidQuote(String),
}

impl FetchError {
    /// Whether a later attempt could plausibly succeed.
    ///
    /// Only transport failures and 429/5xx statuses qualify.
    /// Shape errors are deterministic and never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Whether the request itself failed, as opposed to its payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status { .. })
    }
}

/// Errors that end a websocket session.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("server reported error: {0}")]
    Server(String),

    #[error("failed to obtain websocket token: {0}")]
    Token(#[from] FetchError),

    #[error("stream ended unexpectedly")]
    StreamEnded,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
    }

    #[test]
    fn test_field_errors_are_not_retryable() {
        let err = FetchError::from(FieldError::Missing("askPrice"));
        assert!(!err.is_retryable());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "missing field `askPrice`");
    }
}
