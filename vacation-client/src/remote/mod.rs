//! Remote record service
//!
//! The tabular service that owns the authoritative request list. The trait
//! abstracts the transport so the store can run against the real HTTP
//! dialect or the in-memory double.

pub mod http;
pub mod mapping;
pub mod memory;
mod schema;

pub use http::HttpRecordService;
pub use mapping::map_fields;
pub use memory::InMemoryRemoteService;
pub use schema::{FieldDefinition, FieldKind, ListSchema, ProvisionReport, ensure_list};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::error::{ErrorCategory, ErrorCode};
use shared::models::Employee;
use shared::query::{Filter, SortSpec};
use thiserror::Error;

/// Loosely typed item as exchanged with the service
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Message fragments that mark an opaque failure as a connectivity problem
pub const CONNECTIVITY_MARKERS: &[&str] = &[
    "network",
    "connection",
    "timeout",
    "fetch",
    "cors",
    "failed to fetch",
    "networkerror",
];

/// Remote service error type
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service unreachable
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// List or item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Any other non-success status
    #[error("Remote returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RemoteError {
    /// Classify an opaque error message
    ///
    /// Connectivity markers produce `Connection` / `Timeout`; anything else is
    /// treated as a rejected request.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match classify_message(&message) {
            Some(ErrorCode::Timeout) => Self::Timeout(message),
            Some(_) => Self::Connection(message),
            None => Self::Status {
                status: 500,
                message,
            },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Http(e) => classify_transport(e),
            Self::Connection(message) => {
                classify_message(message).unwrap_or(ErrorCode::NetworkUnreachable)
            }
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::NotFound(_) => ErrorCode::RequestNotFound,
            Self::Unauthorized | Self::Forbidden(_) => ErrorCode::PermissionDenied,
            Self::Status { status, .. } => classify_status(*status),
            Self::InvalidResponse(_) | Self::Serialization(_) => ErrorCode::InvalidResponse,
        }
    }

    /// Whether this failure should move the store onto its mirror
    pub fn is_connectivity(&self) -> bool {
        self.code().category() == ErrorCategory::Connectivity
    }
}

/// Connectivity code for a message, if it carries any marker
pub fn classify_message(message: &str) -> Option<ErrorCode> {
    let lower = message.to_lowercase();

    if !CONNECTIVITY_MARKERS.iter().any(|m| lower.contains(m)) {
        return None;
    }

    if lower.contains("timeout") || lower.contains("timed out") {
        Some(ErrorCode::Timeout)
    } else if lower.contains("cors") || lower.contains("handshake") {
        Some(ErrorCode::HandshakeFailed)
    } else {
        Some(ErrorCode::NetworkUnreachable)
    }
}

fn classify_status(status: u16) -> ErrorCode {
    match status {
        408 | 504 => ErrorCode::Timeout,
        502 | 503 => ErrorCode::NetworkUnreachable,
        401 | 403 => ErrorCode::PermissionDenied,
        404 => ErrorCode::RequestNotFound,
        _ => ErrorCode::RemoteRejected,
    }
}

fn classify_transport(err: &reqwest::Error) -> ErrorCode {
    if err.is_timeout() {
        return ErrorCode::Timeout;
    }
    if err.is_connect() {
        return ErrorCode::NetworkUnreachable;
    }
    if err.is_decode() {
        return ErrorCode::InvalidResponse;
    }
    if let Some(status) = err.status() {
        return classify_status(status.as_u16());
    }
    if err.is_request() {
        // DNS failures, TLS handshakes and resets surface as request errors
        return classify_message(&err.to_string()).unwrap_or(ErrorCode::NetworkUnreachable);
    }
    classify_message(&err.to_string()).unwrap_or(ErrorCode::RemoteRejected)
}

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Item query; the HTTP transport renders it as OData parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteQuery {
    pub select: Vec<String>,
    pub expand: Vec<String>,
    pub filter: Option<Filter>,
    pub order_by: Option<SortSpec>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
}

impl RemoteQuery {
    /// Request projection with the standard select / expand lists
    pub fn requests(filter: Option<Filter>) -> Self {
        Self {
            select: mapping::SELECT.iter().map(|s| s.to_string()).collect(),
            expand: mapping::EXPAND.iter().map(|s| s.to_string()).collect(),
            filter,
            ..Self::default()
        }
    }

    pub fn with_order_by(mut self, sort: SortSpec) -> Self {
        self.order_by = Some(sort);
        self
    }

    pub fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn with_skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// The signed-in user as the service reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub employee: Employee,
    pub is_site_admin: bool,
}

/// Operations consumed from the remote record service
#[async_trait]
pub trait RemoteRecordService: Send + Sync {
    async fn list_exists(&self, list: &str) -> RemoteResult<bool>;

    async fn create_list(&self, list: &str, description: &str) -> RemoteResult<()>;

    /// Create the field when absent; returns whether it was created
    async fn ensure_field(&self, list: &str, field: &FieldDefinition) -> RemoteResult<bool>;

    async fn query_items(&self, list: &str, query: &RemoteQuery) -> RemoteResult<Vec<FieldMap>>;

    async fn get_item(&self, list: &str, id: u64) -> RemoteResult<FieldMap>;

    /// Returns the id assigned by the service
    async fn add_item(&self, list: &str, fields: FieldMap) -> RemoteResult<u64>;

    /// Merge the supplied columns into the item
    async fn update_item(&self, list: &str, id: u64, fields: FieldMap) -> RemoteResult<()>;

    async fn delete_item(&self, list: &str, id: u64) -> RemoteResult<()>;

    async fn current_user(&self) -> RemoteResult<CurrentUser>;

    async fn current_user_groups(&self) -> RemoteResult<Vec<String>>;

    /// Directory lookup by name or email
    async fn search_users(&self, text: &str, top: usize) -> RemoteResult<Vec<Employee>>;
}
