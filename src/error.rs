//! Error types for the price pipeline
//!
//! Every failure is returned as a value so the presentation layer can
//! render a distinct message per variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single price-series fetch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Rate limited by market-data API")]
    RateLimited,

    #[error("HTTP error: status {0}")]
    HttpError(u16),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Payload contained no price points")]
    EmptyPayload,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid token id: {0:?}")]
    InvalidToken(String),
}

impl FetchError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        FetchError::MalformedPayload(reason.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        FetchError::NetworkError(msg.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> ErrorCode {
        match self {
            FetchError::RateLimited => ErrorCode::RateLimited,
            FetchError::HttpError(_) => ErrorCode::HttpError,
            FetchError::MalformedPayload(_) => ErrorCode::MalformedPayload,
            FetchError::EmptyPayload => ErrorCode::EmptyPayload,
            FetchError::NetworkError(_) => ErrorCode::NetworkError,
            FetchError::Timeout => ErrorCode::Timeout,
            FetchError::InvalidToken(_) => ErrorCode::InvalidToken,
        }
    }

    /// Message suitable for showing to an end user.
    ///
    /// Internal detail (parse reasons, transport messages) is left out so the
    /// text depends only on the variant and the status code.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::RateLimited => {
                "The market-data API is rate limiting requests. Try again in a minute.".to_string()
            }
            FetchError::HttpError(404) => {
                "The market-data API does not know this token.".to_string()
            }
            FetchError::HttpError(status) => {
                format!("The market-data API answered with HTTP {}.", status)
            }
            FetchError::MalformedPayload(_) => {
                "The market-data API returned data in an unexpected format.".to_string()
            }
            FetchError::EmptyPayload => {
                "No price history is available for this period.".to_string()
            }
            FetchError::NetworkError(_) => {
                "Could not reach the market-data API. Check your connection.".to_string()
            }
            FetchError::Timeout => {
                "The market-data API took too long to respond.".to_string()
            }
            FetchError::InvalidToken(id) => format!("{:?} is not a valid token id.", id),
        }
    }

    /// Whether a later identical request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited | FetchError::NetworkError(_) | FetchError::Timeout
        ) || matches!(self, FetchError::HttpError(status) if *status >= 500)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::NetworkError(format!("Connection failed: {}", e))
        } else if e.is_decode() {
            FetchError::MalformedPayload(format!("Body could not be decoded: {}", e))
        } else {
            FetchError::NetworkError(e.to_string())
        }
    }
}

/// Error codes for categorization in JSON output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RateLimited,
    HttpError,
    MalformedPayload,
    EmptyPayload,
    NetworkError,
    Timeout,
    InvalidToken,
}

/// Serializable view of a fetch failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Whether repeating the request later may succeed
    pub retryable: bool,
}

impl From<&FetchError> for ErrorReport {
    fn from(e: &FetchError) -> Self {
        let (status, details) = match e {
            FetchError::HttpError(status) => (Some(*status), None),
            FetchError::MalformedPayload(reason) => (None, Some(reason.clone())),
            FetchError::NetworkError(msg) => (None, Some(msg.clone())),
            _ => (None, None),
        };

        Self {
            code: e.code(),
            message: e.user_message(),
            status,
            details,
            retryable: e.is_transient(),
        }
    }
}

/// Configuration rejected at construction time
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Lookback must be between {min} and {max} days, got {value}")]
    DaysOutOfRange { value: u32, min: u32, max: u32 },

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("HTTPS required for non-local endpoint: {0}")]
    InsecureUrl(String),

    #[error("Timeout must be between 1ms and {max_secs}s")]
    InvalidTimeout { max_secs: u64 },

    #[error("Rate-limit pause must be at most {max_pause_secs}s with at most {max_retries} retries")]
    InvalidRateLimit { max_pause_secs: u64, max_retries: u32 },

    #[error("Cache bucket width must be at least one second")]
    InvalidBucket,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
