//! The authorization gate: role stage and permission stage.
//!
//! Both checks here are pure (no IO, no panics). The stage in between, which
//! loads or auto-provisions the admin profile, needs storage and lives with
//! the HTTP layer; the HTTP layer composes the three into the full gate.

use thiserror::Error;

use vitrine_core::UserId;

use crate::{AccessLevel, Action, AdminProfile, Resource, Role};

/// An authenticated actor: resolved user id plus coarse role.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Terminal gate outcomes other than "allow".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("admin access required")]
    ForbiddenRole,

    #[error("permission denied: {resource}.{action}")]
    PermissionDenied { resource: Resource, action: Action },

    #[error("failed to provision admin profile: {0}")]
    ProfileProvisioning(String),
}

/// Role stage: only authenticated admins proceed to profile/permission checks.
pub fn check_role(principal: Option<&Principal>) -> Result<&Principal, GateError> {
    let principal = principal.ok_or(GateError::Unauthenticated)?;
    if principal.role != Role::Admin {
        return Err(GateError::ForbiddenRole);
    }
    Ok(principal)
}

/// Permission stage: decide (resource, action) against the profile grid.
///
/// An explicit `true` in the grid allows. A missing/false entry still allows
/// when the profile is `super_admin` or the principal role is `admin`: the
/// coarse role supplies a floor of access, so the grid is advisory for plain
/// admins. Do not tighten this without a product decision.
pub fn check_permission(
    principal: &Principal,
    profile: &AdminProfile,
    resource: Resource,
    action: Action,
) -> Result<(), GateError> {
    if profile.permissions.allows(resource, action) {
        return Ok(());
    }

    if profile.access_level == AccessLevel::SuperAdmin || principal.role == Role::Admin {
        return Ok(());
    }

    Err(GateError::PermissionDenied { resource, action })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{ActionSet, PermissionGrid};

    fn admin_principal() -> Principal {
        Principal::new(UserId::new(), Role::Admin)
    }

    fn profile_with(access_level: AccessLevel, permissions: PermissionGrid) -> AdminProfile {
        let mut profile = AdminProfile::provisioned(UserId::new(), Utc::now());
        profile.access_level = access_level;
        profile.permissions = permissions;
        profile
    }

    #[test]
    fn missing_principal_is_unauthenticated() {
        assert_eq!(check_role(None).unwrap_err(), GateError::Unauthenticated);
    }

    #[test]
    fn non_admin_roles_never_pass_the_role_stage() {
        for role in [Role::User, Role::Moderator] {
            let principal = Principal::new(UserId::new(), role);
            assert_eq!(
                check_role(Some(&principal)).unwrap_err(),
                GateError::ForbiddenRole,
            );
        }
    }

    #[test]
    fn admin_passes_the_role_stage() {
        let principal = admin_principal();
        assert!(check_role(Some(&principal)).is_ok());
    }

    #[test]
    fn explicit_grant_allows() {
        let principal = admin_principal();
        let profile = profile_with(AccessLevel::Moderator, PermissionGrid::default_grid());

        assert!(check_permission(&principal, &profile, Resource::Contacts, Action::Write).is_ok());
    }

    #[test]
    fn admin_role_floor_allows_despite_denied_grid_entry() {
        // permissions.admin.write is false and the level is not super_admin,
        // yet role=admin supplies the floor. Shipped behavior, asserted as-is.
        let principal = admin_principal();
        let profile = profile_with(AccessLevel::Admin, PermissionGrid::default_grid());
        assert!(!profile.permissions.allows(Resource::Admin, Action::Write));

        assert!(check_permission(&principal, &profile, Resource::Admin, Action::Write).is_ok());
    }

    #[test]
    fn super_admin_allows_everything_even_with_empty_grid() {
        let principal = Principal::new(UserId::new(), Role::Moderator);
        let empty = PermissionGrid {
            users: ActionSet::NONE,
            subscriptions: ActionSet::NONE,
            contacts: ActionSet::NONE,
            admin: ActionSet::NONE,
        };
        let profile = profile_with(AccessLevel::SuperAdmin, empty);

        for resource in Resource::ALL {
            for action in Action::ALL {
                assert!(check_permission(&principal, &profile, resource, action).is_ok());
            }
        }
    }

    #[test]
    fn denied_without_grant_floor_or_super_admin() {
        let principal = Principal::new(UserId::new(), Role::Moderator);
        let profile = profile_with(AccessLevel::ReadOnly, PermissionGrid::default_grid());

        let err = check_permission(&principal, &profile, Resource::Admin, Action::Delete)
            .unwrap_err();
        assert_eq!(
            err,
            GateError::PermissionDenied { resource: Resource::Admin, action: Action::Delete },
        );
        assert_eq!(err.to_string(), "permission denied: admin.delete");
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        fn arb_action_set() -> impl Strategy<Value = ActionSet> {
            (any::<bool>(), any::<bool>(), any::<bool>())
                .prop_map(|(read, write, delete)| ActionSet { read, write, delete })
        }

        fn arb_grid() -> impl Strategy<Value = PermissionGrid> {
            (arb_action_set(), arb_action_set(), arb_action_set(), arb_action_set()).prop_map(
                |(users, subscriptions, contacts, admin)| PermissionGrid {
                    users,
                    subscriptions,
                    contacts,
                    admin,
                },
            )
        }

        proptest! {
            /// Property: for role=admin every check allows, whatever the grid
            /// says (the floor makes the grid advisory for plain admins).
            #[test]
            fn admin_role_allows_for_any_grid(grid in arb_grid()) {
                let principal = admin_principal();
                let profile = profile_with(AccessLevel::Admin, grid);

                for resource in Resource::ALL {
                    for action in Action::ALL {
                        prop_assert!(
                            check_permission(&principal, &profile, resource, action).is_ok()
                        );
                    }
                }
            }

            /// Property: without the floor or super_admin, the decision is
            /// exactly the grid entry.
            #[test]
            fn non_floor_decision_equals_grid_entry(grid in arb_grid()) {
                let principal = Principal::new(UserId::new(), Role::Moderator);
                let profile = profile_with(AccessLevel::Moderator, grid);

                for resource in Resource::ALL {
                    for action in Action::ALL {
                        let allowed =
                            check_permission(&principal, &profile, resource, action).is_ok();
                        prop_assert_eq!(allowed, grid.allows(resource, action));
                    }
                }
            }
        }
    }
}
