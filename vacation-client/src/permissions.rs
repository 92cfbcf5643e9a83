//! Permission Resolution
//!
//! Derives a capability set from the caller's identity and group membership.
//! The result gates which intents a UI offers; the lifecycle re-derives it
//! for every transition and enforces it independently.

use serde::{Deserialize, Serialize};
use shared::models::Employee;

use crate::remote::{RemoteRecordService, RemoteResult};

/// Group name fragments that grant administrator rights (case-insensitive)
pub const ADMIN_GROUP_MARKERS: &[&str] = &["admin", "owner"];

/// Resolved caller identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub employee: Employee,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Platform-level administrator flag
    #[serde(default)]
    pub is_site_admin: bool,
}

impl Identity {
    pub fn new(employee: Employee) -> Self {
        Self {
            employee,
            groups: Vec::new(),
            is_site_admin: false,
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn site_admin(mut self) -> Self {
        self.is_site_admin = true;
        self
    }

    pub fn id(&self) -> u64 {
        self.employee.id
    }
}

/// Capability set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissions {
    pub can_approve: bool,
    pub can_reject: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub is_admin: bool,
}

/// Baseline policy: administrators may do everything, everyone may create
pub struct PermissionResolver;

impl PermissionResolver {
    pub fn resolve(identity: &Identity) -> UserPermissions {
        let is_admin = identity.is_site_admin || identity.groups.iter().any(|g| is_admin_group(g));

        UserPermissions {
            can_approve: is_admin,
            can_reject: is_admin,
            can_create: true,
            can_edit: is_admin,
            can_delete: is_admin,
            is_admin,
        }
    }
}

fn is_admin_group(name: &str) -> bool {
    let name = name.to_lowercase();
    ADMIN_GROUP_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Look up the current user and their groups on the remote service
pub async fn fetch_identity(service: &dyn RemoteRecordService) -> RemoteResult<Identity> {
    let user = service.current_user().await?;
    let groups = service.current_user_groups().await?;

    tracing::debug!(
        user_id = user.employee.id,
        groups = groups.len(),
        site_admin = user.is_site_admin,
        "Resolved current identity"
    );

    Ok(Identity {
        employee: user.employee,
        groups,
        is_site_admin: user.is_site_admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{CurrentUser, InMemoryRemoteService};

    fn employee() -> Employee {
        Employee::new(42, "Carla Mendes", "carla@example.com")
    }

    #[test]
    fn test_plain_member_can_only_create() {
        let perms = PermissionResolver::resolve(&Identity::new(employee()).with_groups(["HR Members"]));
        assert!(perms.can_create);
        assert!(!perms.is_admin);
        assert!(!perms.can_approve);
        assert!(!perms.can_reject);
        assert!(!perms.can_edit);
        assert!(!perms.can_delete);
    }

    #[test]
    fn test_admin_group_match_is_case_insensitive() {
        for group in ["Site ADMINS", "HR Owners", "owner"] {
            let perms = PermissionResolver::resolve(&Identity::new(employee()).with_groups([group]));
            assert!(perms.is_admin, "group {}", group);
            assert!(perms.can_approve && perms.can_reject && perms.can_edit && perms.can_delete);
        }
    }

    #[test]
    fn test_site_admin_flag() {
        let perms = PermissionResolver::resolve(&Identity::new(employee()).site_admin());
        assert!(perms.is_admin);
    }

    #[tokio::test]
    async fn test_fetch_identity_from_remote() {
        let remote = InMemoryRemoteService::new();
        remote.set_current_user(
            CurrentUser {
                employee: employee(),
                is_site_admin: false,
            },
            vec!["Vacation Owners".to_string()],
        );

        let identity = fetch_identity(&remote).await.unwrap();
        assert_eq!(identity.id(), 42);
        assert!(PermissionResolver::resolve(&identity).is_admin);
    }
}
