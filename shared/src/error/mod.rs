//! Unified error system for the vacation request core
//!
//! - [`ErrorCode`]: standardized numeric codes for every failure
//! - [`ErrorCategory`]: classification of codes by range
//! - [`ValidationError`]: the synchronous, pre-I/O rejection raised by
//!   drafts, filters, sort specs and transitions
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Validation errors
//! - 2xxx: Request errors
//! - 3xxx: Permission errors
//! - 4xxx: Connectivity errors
//! - 5xxx: Storage errors
//! - 9xxx: System errors

mod category;
mod codes;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};

use thiserror::Error;

/// Validation failure detected before any I/O is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Specific validation code (1xxx)
    pub code: ErrorCode,
    /// Offending field name
    pub field: &'static str,
    /// Human-readable message
    pub message: String,
}

impl ValidationError {
    pub fn new(code: ErrorCode, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            field,
            message: message.into(),
        }
    }

    pub fn invalid_date_range(field: &'static str) -> Self {
        Self::new(
            ErrorCode::InvalidDateRange,
            field,
            ErrorCode::InvalidDateRange.message(),
        )
    }

    pub fn rejection_notes_required() -> Self {
        Self::new(
            ErrorCode::RejectionNotesRequired,
            "notes",
            ErrorCode::RejectionNotesRequired.message(),
        )
    }

    pub fn unknown_sort_field(field: &str) -> Self {
        Self::new(
            ErrorCode::UnknownSortField,
            "sort.field",
            format!("unsupported sort field '{}'", field),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::unknown_sort_field("Password");
        assert_eq!(err.code, ErrorCode::UnknownSortField);
        assert_eq!(err.to_string(), "sort.field: unsupported sort field 'Password'");
    }

    #[test]
    fn test_validation_codes_are_validation_category() {
        assert_eq!(
            ValidationError::rejection_notes_required().code.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ValidationError::invalid_date_range("startDate").code.category(),
            ErrorCategory::Validation
        );
    }
}
