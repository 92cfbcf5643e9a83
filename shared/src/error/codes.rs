//! Unified error codes for the vacation request core
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Validation errors
//! - 2xxx: Request / lifecycle errors
//! - 3xxx: Permission errors
//! - 4xxx: Connectivity errors
//! - 5xxx: Storage errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the presentation layer
/// can map them to localized messages without parsing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,

    // ==================== 1xxx: Validation ====================
    /// Validation failed
    ValidationFailed = 1001,
    /// Start date is after end date (draft or filter)
    InvalidDateRange = 1002,
    /// Total days outside the allowed length policy
    InvalidTotalDays = 1003,
    /// Rejection requires a non-empty justification
    RejectionNotesRequired = 1004,
    /// Sort field is not in the allow-list
    UnknownSortField = 1005,
    /// Text field exceeds its maximum length
    FieldTooLong = 1006,

    // ==================== 2xxx: Request ====================
    /// Vacation request not found
    RequestNotFound = 2001,
    /// State machine rejected the transition
    InvalidTransition = 2002,

    // ==================== 3xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 3001,
    /// Approver capability required
    ApproverRequired = 3002,
    /// Only the requester or an administrator may act
    RequesterOrAdminRequired = 3003,

    // ==================== 4xxx: Connectivity ====================
    /// Remote service unreachable
    NetworkUnreachable = 4001,
    /// Remote call timed out
    Timeout = 4002,
    /// TLS handshake or cross-origin failure
    HandshakeFailed = 4003,

    // ==================== 5xxx: Storage ====================
    /// Local mirror storage failure
    StorageError = 5001,
    /// Local mirror contents could not be decoded
    StorageCorrupted = 5002,
    /// Remote service answered with an error status
    RemoteRejected = 5003,
    /// Remote service answered with an unreadable payload
    InvalidResponse = 5004,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",

            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidDateRange => "Start date must not be after end date",
            ErrorCode::InvalidTotalDays => "Total days is outside the allowed range",
            ErrorCode::RejectionNotesRequired => "Rejection requires a justification",
            ErrorCode::UnknownSortField => "Sort field is not supported",
            ErrorCode::FieldTooLong => "Field value is too long",

            ErrorCode::RequestNotFound => "Vacation request not found",
            ErrorCode::InvalidTransition => "Transition is not allowed from the current state",

            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::ApproverRequired => "Approver capability is required",
            ErrorCode::RequesterOrAdminRequired => {
                "Only the requester or an administrator may do this"
            }

            ErrorCode::NetworkUnreachable => "Remote service is unreachable",
            ErrorCode::Timeout => "Remote service timed out",
            ErrorCode::HandshakeFailed => "Remote handshake failed",

            ErrorCode::StorageError => "Local storage error",
            ErrorCode::StorageCorrupted => "Local storage is corrupted",
            ErrorCode::RemoteRejected => "Remote service rejected the request",
            ErrorCode::InvalidResponse => "Remote service returned an invalid response",

            ErrorCode::InternalError => "Internal error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),

            1001 => Ok(ErrorCode::ValidationFailed),
            1002 => Ok(ErrorCode::InvalidDateRange),
            1003 => Ok(ErrorCode::InvalidTotalDays),
            1004 => Ok(ErrorCode::RejectionNotesRequired),
            1005 => Ok(ErrorCode::UnknownSortField),
            1006 => Ok(ErrorCode::FieldTooLong),

            2001 => Ok(ErrorCode::RequestNotFound),
            2002 => Ok(ErrorCode::InvalidTransition),

            3001 => Ok(ErrorCode::PermissionDenied),
            3002 => Ok(ErrorCode::ApproverRequired),
            3003 => Ok(ErrorCode::RequesterOrAdminRequired),

            4001 => Ok(ErrorCode::NetworkUnreachable),
            4002 => Ok(ErrorCode::Timeout),
            4003 => Ok(ErrorCode::HandshakeFailed),

            5001 => Ok(ErrorCode::StorageError),
            5002 => Ok(ErrorCode::StorageCorrupted),
            5003 => Ok(ErrorCode::RemoteRejected),
            5004 => Ok(ErrorCode::InvalidResponse),

            9001 => Ok(ErrorCode::InternalError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
