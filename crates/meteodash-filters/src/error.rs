//! Filter store error types.

use meteodash_core::AppError;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid date range {start}..{end}: end must follow start within {max_days} days")]
    InvalidRange {
        start: String,
        end: String,
        max_days: i64,
    },

    #[error("Failed to persist filters: {0}")]
    Storage(#[from] StorageError),
}

impl FilterError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRange { max_days, .. } => format!(
                "Please choose an end date after the start date, at most {} days apart.",
                max_days
            ),
            Self::Storage(_) => "Your filter choices could not be saved.".to_string(),
        }
    }
}

impl From<FilterError> for AppError {
    fn from(e: FilterError) -> Self {
        AppError::Storage(e.to_string())
    }
}
