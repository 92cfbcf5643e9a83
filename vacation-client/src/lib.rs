//! Vacation Client - resilient record store for vacation requests
//!
//! Talks to the remote record service and falls back to a local redb mirror
//! when the service cannot be reached.

pub mod avatar;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod mirror;
pub mod permissions;
pub mod query;
pub mod remote;
pub mod store;

pub use avatar::{DirectoryService, PhotoLookup, PhotoResolver, fallback_avatar};
pub use config::ClientConfig;
pub use error::{ErrorKind, StoreError, StoreResult};
pub use lifecycle::{Event, RequestDelta, Transition, allowed_events};
pub use logger::{cleanup_old_logs, init_logger, init_logger_with_file};
pub use mirror::{LocalMirrorStore, MirrorError, MirrorResult, demo_requests};
pub use permissions::{Identity, PermissionResolver, UserPermissions, fetch_identity};
pub use remote::{
    HttpRecordService, InMemoryRemoteService, RemoteError, RemoteQuery, RemoteRecordService,
    RemoteResult,
};
pub use store::ResilientRecordStore;

// Re-export shared types for convenience
pub use shared::{
    ConnectionMode, Employee, ErrorCode, Filter, ListQuery, PageResult, RequestState, RequestStats,
    SortField, SortSpec, VacationDraft, VacationRequest,
};
