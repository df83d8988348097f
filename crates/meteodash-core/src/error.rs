//! Centralized error types for the dashboard.
//!
//! This module provides a typed error hierarchy that:
//! - Distinguishes fetch failures the way the UI reports them
//! - Provides user-friendly messages suitable for display
//! - Preserves full error context for logging

use thiserror::Error;

/// Category of a failed weather fetch, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No connection to the archive (connect failure or timeout).
    Offline,
    /// The archive has no data for the location or range.
    NotFound,
    /// Too many requests; the archive asked us to back off.
    RateLimited,
    /// The archive failed with a 5xx status.
    Server,
    /// Anything else (bad request, unreadable response).
    Other,
}

impl FailureKind {
    pub fn user_message(self) -> &'static str {
        match self {
            FailureKind::Offline => "You appear to be offline. Check your internet connection.",
            FailureKind::NotFound => "No weather data is available for this location and date range.",
            FailureKind::RateLimited => "Too many requests. Please wait a moment and try again.",
            FailureKind::Server => {
                "The weather service is experiencing issues. Please try again later."
            }
            FailureKind::Other => "Failed to load data. Please try again.",
        }
    }

    /// Short heading used above the message.
    pub fn title(self) -> &'static str {
        match self {
            FailureKind::Offline => "No connection",
            FailureKind::NotFound => "No data",
            FailureKind::RateLimited => "Rate limited",
            FailureKind::Server => "Service error",
            FailureKind::Other => "Failed to load data",
        }
    }
}

/// Top-level application error type.
///
/// Use `user_message()` to get a display-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather fetch failed: {message}")]
    Weather { kind: FailureKind, message: String },

    #[error("Filter storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn weather(kind: FailureKind, message: impl Into<String>) -> Self {
        AppError::Weather {
            kind,
            message: message.into(),
        }
    }

    /// Classify a failed config load: typed config errors keep their kind,
    /// anything else (unreadable file, no config dir) becomes `Other`.
    pub fn from_config_load(err: anyhow::Error) -> Self {
        match err.downcast::<ConfigError>() {
            Ok(config_err) => AppError::Config(config_err),
            Err(other) => AppError::Other(other),
        }
    }

    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Weather { kind, .. } => kind.user_message(),
            AppError::Storage(_) => "Saved filters could not be read. Defaults are in use.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// Whether re-issuing the same request can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Weather {
                kind: FailureKind::Offline | FailureKind::RateLimited | FailureKind::Server,
                ..
            }
        )
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}
