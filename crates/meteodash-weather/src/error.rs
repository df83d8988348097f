//! Weather fetch error types.

use meteodash_core::{AppError, FailureKind};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No data found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl WeatherError {
    /// Category used to pick the message shown to the user.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(e) if e.is_timeout() || e.is_connect() => FailureKind::Offline,
            Self::Network(e) => match e.status() {
                Some(status) => kind_for_status(status),
                None => FailureKind::Offline,
            },
            Self::NotFound(_) => FailureKind::NotFound,
            Self::RateLimited(_) => FailureKind::RateLimited,
            Self::Server { .. } => FailureKind::Server,
            Self::BadRequest(_) | Self::Api(_) | Self::Parse(_) => FailureKind::Other,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }

    /// Whether re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                match e.status() {
                    Some(status) => is_retryable_status(status),
                    None => false,
                }
            }
            Self::RateLimited(_) | Self::Server { .. } => true,
            Self::Api(_) | Self::BadRequest(_) | Self::NotFound(_) | Self::Parse(_) => false,
        }
    }
}

fn kind_for_status(status: StatusCode) -> FailureKind {
    if status == StatusCode::NOT_FOUND {
        FailureKind::NotFound
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        FailureKind::RateLimited
    } else if status.is_server_error() {
        FailureKind::Server
    } else {
        FailureKind::Other
    }
}

/// 5xx, 408 and 429 are worth another attempt; other statuses are not.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

impl From<&WeatherError> for AppError {
    fn from(e: &WeatherError) -> Self {
        AppError::weather(e.kind(), e.to_string())
    }
}
