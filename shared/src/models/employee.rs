//! Employee Model

use serde::{Deserialize, Serialize};

/// Directory reference data for a person (requester or approver)
///
/// Owned by the directory collaborator; the core only caches it read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: u64,
    pub display_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Employee {
    pub fn new(id: u64, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email: email.into(),
            job_title: None,
            department: None,
            photo_url: None,
        }
    }

    pub fn with_job_title(mut self, job_title: impl Into<String>) -> Self {
        self.job_title = Some(job_title.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Bookkeeping projection used for createdBy / lastModifiedBy
    pub fn as_user_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            title: self.display_name.clone(),
        }
    }
}

/// Minimal user projection stored in bookkeeping fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub title: String,
}

impl UserRef {
    /// Placeholder used when the store cannot attribute a write
    pub fn system() -> Self {
        Self {
            id: 0,
            title: "System".to_string(),
        }
    }
}
