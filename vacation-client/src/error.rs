//! Store error types

use shared::error::{ErrorCategory, ErrorCode, ValidationError};
use shared::models::RequestState;
use thiserror::Error;

use crate::mirror::MirrorError;
use crate::remote::RemoteError;

/// Coarse error kinds surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidTransition,
    Connectivity,
    PermissionDenied,
    /// Remote answered with a non-connectivity failure
    Remote,
    /// Local mirror failure
    Storage,
}

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// Rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No record with this id in the active source
    #[error("Vacation request not found: {0}")]
    NotFound(u64),

    /// State machine precondition violated
    #[error("Cannot {event} a request in state {from}")]
    InvalidTransition {
        from: RequestState,
        event: &'static str,
    },

    /// Lifecycle capability cross-check failed
    #[error("Permission denied: {message}")]
    PermissionDenied { code: ErrorCode, message: String },

    /// Remote record service failure
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Local mirror failure
    #[error("Mirror error: {0}")]
    Mirror(MirrorError),
}

impl From<MirrorError> for StoreError {
    fn from(err: MirrorError) -> Self {
        match err {
            MirrorError::NotFound(id) => Self::NotFound(id),
            other => Self::Mirror(other),
        }
    }
}

impl StoreError {
    pub fn permission_denied(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            code,
            message: message.into(),
        }
    }

    /// Unified error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(e) => e.code,
            Self::NotFound(_) => ErrorCode::RequestNotFound,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::PermissionDenied { code, .. } => *code,
            Self::Remote(e) => e.code(),
            Self::Mirror(e) => e.code(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Remote(e) if e.is_connectivity() => ErrorKind::Connectivity,
            Self::Remote(_) => ErrorKind::Remote,
            Self::Mirror(_) => ErrorKind::Storage,
        }
    }

    /// The only kind that moves a store onto its mirror
    pub fn is_connectivity(&self) -> bool {
        self.code().category() == ErrorCategory::Connectivity
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
