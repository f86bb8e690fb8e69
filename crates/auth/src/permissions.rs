//! Typed resource/action permission grid.
//!
//! Resources and actions are closed enums and the grid is a plain struct, so
//! an unknown key is a deserialization error rather than a silently-ignored
//! lookup miss.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use vitrine_core::DomainError;

/// A protected resource area of the admin dashboard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Users,
    Subscriptions,
    Contacts,
    Admin,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Users,
        Resource::Subscriptions,
        Resource::Contacts,
        Resource::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Subscriptions => "subscriptions",
            Resource::Contacts => "contacts",
            Resource::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Resource::Users),
            "subscriptions" => Ok(Resource::Subscriptions),
            "contacts" => Ok(Resource::Contacts),
            "admin" => Ok(Resource::Admin),
            other => Err(DomainError::validation(format!("unknown resource '{other}'"))),
        }
    }
}

/// An operation on a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Delete,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Read, Action::Write, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed actions for a single resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSet {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub delete: bool,
}

impl ActionSet {
    pub const NONE: ActionSet = ActionSet { read: false, write: false, delete: false };
    pub const READ_ONLY: ActionSet = ActionSet { read: true, write: false, delete: false };
    pub const READ_WRITE: ActionSet = ActionSet { read: true, write: true, delete: false };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.read,
            Action::Write => self.write,
            Action::Delete => self.delete,
        }
    }
}

/// The full permission grid carried by an admin profile.
///
/// The key set mirrors [`Resource`] exactly; `deny_unknown_fields` makes a
/// stray key a hard error at construction time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionGrid {
    #[serde(default)]
    pub users: ActionSet,
    #[serde(default)]
    pub subscriptions: ActionSet,
    #[serde(default)]
    pub contacts: ActionSet,
    #[serde(default)]
    pub admin: ActionSet,
}

impl PermissionGrid {
    /// Grid assigned to profiles that are created without an explicit one:
    /// users and subscriptions read-only, contacts read+write, admin nothing.
    ///
    /// Always a fresh value; the default is never shared or mutated in place.
    pub fn default_grid() -> Self {
        Self {
            users: ActionSet::READ_ONLY,
            subscriptions: ActionSet::READ_ONLY,
            contacts: ActionSet::READ_WRITE,
            admin: ActionSet::NONE,
        }
    }

    pub fn entry(&self, resource: Resource) -> &ActionSet {
        match resource {
            Resource::Users => &self.users,
            Resource::Subscriptions => &self.subscriptions,
            Resource::Contacts => &self.contacts,
            Resource::Admin => &self.admin,
        }
    }

    /// Whether the grid explicitly allows `action` on `resource`.
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.entry(resource).allows(action)
    }
}

impl Default for PermissionGrid {
    fn default() -> Self {
        Self::default_grid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_matches_fixture() {
        let grid = PermissionGrid::default_grid();
        assert!(grid.allows(Resource::Users, Action::Read));
        assert!(!grid.allows(Resource::Users, Action::Write));
        assert!(grid.allows(Resource::Subscriptions, Action::Read));
        assert!(!grid.allows(Resource::Subscriptions, Action::Delete));
        assert!(grid.allows(Resource::Contacts, Action::Read));
        assert!(grid.allows(Resource::Contacts, Action::Write));
        assert!(!grid.allows(Resource::Contacts, Action::Delete));
        for action in Action::ALL {
            assert!(!grid.allows(Resource::Admin, action));
        }
    }

    #[test]
    fn grid_round_trips_through_json() {
        let grid = PermissionGrid::default_grid();
        let json = serde_json::to_string(&grid).unwrap();
        let back: PermissionGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(grid, back);
    }

    #[test]
    fn unknown_resource_key_is_rejected() {
        let json = r#"{
            "users": {"read": true, "write": false, "delete": false},
            "billing": {"read": true, "write": false, "delete": false}
        }"#;
        assert!(serde_json::from_str::<PermissionGrid>(json).is_err());
    }

    #[test]
    fn unknown_action_key_is_rejected() {
        let json = r#"{"users": {"read": true, "approve": true}}"#;
        assert!(serde_json::from_str::<PermissionGrid>(json).is_err());
    }

    #[test]
    fn missing_keys_default_to_denied() {
        let grid: PermissionGrid = serde_json::from_str(r#"{"contacts": {"read": true}}"#).unwrap();
        assert!(grid.allows(Resource::Contacts, Action::Read));
        assert!(!grid.allows(Resource::Contacts, Action::Write));
        assert!(!grid.allows(Resource::Users, Action::Read));
    }
}
