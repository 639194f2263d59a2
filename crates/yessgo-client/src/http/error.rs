/*
[INPUT]:  Error sources (HTTP transport, backend status, token decoding, storage)
[OUTPUT]: Structured error types with retry and terminal hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing the refresh failure taxonomy
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the YessGo client core
#[derive(Error, Debug)]
pub enum YessError {
    /// Transport failure (connectivity, timeout, DNS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned 401 for an authenticated call
    #[error("Unauthorized: backend rejected the bearer token")]
    Unauthorized,

    /// Refresh endpoint rejected the refresh token
    #[error("Refresh token rejected, please re-authenticate")]
    RefreshRejected,

    /// No refresh token is stored
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Refresh call failed for a transient reason (network, server error)
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// A previous refresh failed and the cooldown has not elapsed
    #[error("Token refresh is cooling down after a failure")]
    RefreshCoolingDown,

    /// Response could not be interpreted
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Backend returned a non-success status
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Token persistence failed
    #[error("Token storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reasons a bearer token payload could not be read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token does not have three segments")]
    Structure,

    #[error("payload is not valid base64url: {0}")]
    Base64(String),

    #[error("payload is not valid JSON: {0}")]
    Json(String),

    #[error("payload has no 'exp' claim")]
    MissingExpiry,

    #[error("'exp' claim is not an integer timestamp")]
    InvalidExpiry,
}

impl YessError {
    /// Check if the caller may retry the operation later
    pub fn is_retryable(&self) -> bool {
        match self {
            YessError::Http(_) | YessError::RefreshFailed(_) | YessError::RefreshCoolingDown => true,
            YessError::Api { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            YessError::Unauthorized | YessError::RefreshRejected | YessError::NoRefreshToken
        )
    }

    /// Check if the error requires a fresh login; no automatic recovery applies
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            YessError::RefreshRejected | YessError::NoRefreshToken | YessError::MalformedResponse(_)
        )
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return YessError::Unauthorized;
        }
        YessError::Api {
            code: status.as_u16() as i32,
            message: message.into(),
        }
    }
}

/// Result type alias for YessGo client operations
pub type Result<T> = std::result::Result<T, YessError>;
