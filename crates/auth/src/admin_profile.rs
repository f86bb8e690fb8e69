//! Admin profile: per-user record of fine-grained dashboard permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrine_core::{AdminProfileId, UserId};

use crate::{AccessLevel, PermissionGrid};

/// Per-user admin dashboard profile.
///
/// # Invariants
/// - At most one profile per user (unique index on `user_id` in storage).
/// - `permissions` only ever holds keys from the closed resource/action sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub id: AdminProfileId,
    pub user_id: UserId,
    pub access_level: AccessLevel,
    pub permissions: PermissionGrid,
    pub department: Option<String>,
    pub position: Option<String>,
    pub is_active: bool,
    pub last_access_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminProfile {
    /// Profile created implicitly the first time a role=admin user passes the
    /// gate with no profile on record.
    pub fn provisioned(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: AdminProfileId::new(),
            user_id,
            access_level: AccessLevel::Admin,
            permissions: PermissionGrid::default_grid(),
            department: Some("IT".to_string()),
            position: Some("Administrator".to_string()),
            is_active: true,
            last_access_at: None,
            created_by: Some(user_id),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Profile created explicitly by an existing admin for `user_id`.
    pub fn created_by_admin(
        user_id: UserId,
        access_level: AccessLevel,
        permissions: Option<PermissionGrid>,
        department: Option<String>,
        position: Option<String>,
        notes: Option<String>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AdminProfileId::new(),
            user_id,
            access_level,
            permissions: permissions.unwrap_or_else(PermissionGrid::default_grid),
            department,
            position,
            is_active: true,
            last_access_at: None,
            created_by: Some(created_by),
            notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch_access(&mut self, now: DateTime<Utc>) {
        self.last_access_at = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioned_profile_carries_default_grid() {
        let user_id = UserId::new();
        let profile = AdminProfile::provisioned(user_id, Utc::now());

        assert_eq!(profile.user_id, user_id);
        assert_eq!(profile.access_level, AccessLevel::Admin);
        assert_eq!(profile.permissions, PermissionGrid::default_grid());
        assert_eq!(profile.department.as_deref(), Some("IT"));
        assert_eq!(profile.position.as_deref(), Some("Administrator"));
        assert_eq!(profile.created_by, Some(user_id));
        assert!(profile.is_active);
        assert!(profile.last_access_at.is_none());
    }

    #[test]
    fn each_provisioned_grid_is_an_independent_value() {
        let mut a = AdminProfile::provisioned(UserId::new(), Utc::now());
        let b = AdminProfile::provisioned(UserId::new(), Utc::now());

        a.permissions.admin.write = true;
        assert!(!b.permissions.admin.write);
        assert_eq!(b.permissions, PermissionGrid::default_grid());
    }
}
