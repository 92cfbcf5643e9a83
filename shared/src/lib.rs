//! Shared types for the vacation request core
//!
//! Domain records, the query grammar, the connection mode and the unified
//! error code system. Nothing in this crate performs I/O.

pub mod connection;
pub mod error;
pub mod models;
pub mod query;

// Re-exports
pub use connection::ConnectionMode;
pub use error::{ErrorCategory, ErrorCode, ValidationError};
pub use models::{Decision, Employee, RequestState, UserRef, VacationDraft, VacationRequest};
pub use query::{
    Filter, ListQuery, PageRequest, PageResult, RequestStats, SortDirection, SortField, SortSpec,
};
pub use serde::{Deserialize, Serialize};
