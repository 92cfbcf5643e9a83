//! Connection mode of a record store

use serde::{Deserialize, Serialize};

/// Whether a store is reading/writing the remote service or its local mirror
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectionMode {
    #[default]
    Remote,
    LocalMirror {
        /// Human-readable failover reason
        reason: String,
    },
}

impl ConnectionMode {
    pub fn local_mirror(reason: impl Into<String>) -> Self {
        Self::LocalMirror {
            reason: reason.into(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote)
    }

    pub fn is_local_mirror(&self) -> bool {
        matches!(self, Self::LocalMirror { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Remote => None,
            Self::LocalMirror { reason } => Some(reason),
        }
    }
}
