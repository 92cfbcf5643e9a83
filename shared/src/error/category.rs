//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Validation errors
/// - 2xxx: Request errors
/// - 3xxx: Permission errors
/// - 4xxx: Connectivity errors
/// - 5xxx: Storage errors
/// - 9xxx (and anything unassigned): System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Validation errors (1xxx)
    Validation,
    /// Request / lifecycle errors (2xxx)
    Request,
    /// Permission errors (3xxx)
    Permission,
    /// Connectivity errors (4xxx)
    Connectivity,
    /// Storage errors (5xxx)
    Storage,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Validation,
            2000..3000 => Self::Request,
            3000..4000 => Self::Permission,
            4000..5000 => Self::Connectivity,
            5000..6000 => Self::Storage,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Validation => "validation",
            Self::Request => "request",
            Self::Permission => "permission",
            Self::Connectivity => "connectivity",
            Self::Storage => "storage",
            Self::System => "system",
        }
    }

    /// Only connectivity failures move a store onto its local mirror
    pub fn triggers_failover(&self) -> bool {
        matches!(self, Self::Connectivity)
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Validation);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Request);
        assert_eq!(ErrorCategory::from_code(3001), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Connectivity);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Storage);
        assert_eq!(ErrorCategory::from_code(7000), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::RejectionNotesRequired.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ErrorCode::InvalidTransition.category(),
            ErrorCategory::Request
        );
        assert_eq!(ErrorCode::Timeout.category(), ErrorCategory::Connectivity);
        assert_eq!(
            ErrorCode::RemoteRejected.category(),
            ErrorCategory::Storage
        );
    }

    #[test]
    fn test_only_connectivity_triggers_failover() {
        assert!(ErrorCategory::Connectivity.triggers_failover());
        for category in [
            ErrorCategory::General,
            ErrorCategory::Validation,
            ErrorCategory::Request,
            ErrorCategory::Permission,
            ErrorCategory::Storage,
            ErrorCategory::System,
        ] {
            assert!(!category.triggers_failover(), "{}", category.name());
        }
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Connectivity).unwrap();
        assert_eq!(json, "\"connectivity\"");
    }
}
