//! API-side half of the authorization gate.
//!
//! The pure role/permission stages live in `vitrine-auth`. This module adds
//! the stateful stage in between (loading the caller's admin profile,
//! auto-provisioning one on first admin access) and maps gate outcomes onto
//! HTTP responses. Handlers call `require_admin` first and thread the
//! returned profile into `require_permission` for the per-route check.

use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;

use vitrine_auth::{check_permission, check_role, Action, AdminProfile, GateError, Resource};
use vitrine_infra::StoreError;

use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::context::CurrentUser;

/// Role stage + profile stage.
///
/// Rejects non-admin callers, then returns the caller's admin profile,
/// creating one with the default permission grid if this is the first gated
/// access. The losing side of a concurrent first access reuses the winner's
/// row (the storage unique index arbitrates).
pub async fn require_admin(
    services: &AppServices,
    user: &CurrentUser,
) -> Result<AdminProfile, Response> {
    let principal = user.principal();
    check_role(Some(&principal)).map_err(gate_error_to_response)?;

    let existing = services
        .admin_profiles
        .find_by_user_id(principal.user_id)
        .await
        .map_err(provisioning_failure)?;

    if let Some(profile) = existing {
        return Ok(profile);
    }

    let provisioned = AdminProfile::provisioned(principal.user_id, Utc::now());
    let profile = services
        .admin_profiles
        .create_or_reuse(provisioned)
        .await
        .map_err(provisioning_failure)?;

    tracing::info!(user_id = %principal.user_id, "provisioned default admin profile");
    Ok(profile)
}

/// Permission stage for one (resource, action) pair.
pub fn require_permission(
    user: &CurrentUser,
    profile: &AdminProfile,
    resource: Resource,
    action: Action,
) -> Result<(), Response> {
    check_permission(&user.principal(), profile, resource, action)
        .map_err(gate_error_to_response)
}

pub fn gate_error_to_response(err: GateError) -> Response {
    match err {
        GateError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "Authentication required")
        }
        GateError::ForbiddenRole => json_error(StatusCode::FORBIDDEN, "Admin access required"),
        GateError::PermissionDenied { resource, action } => json_error(
            StatusCode::FORBIDDEN,
            format!("Permission denied: {resource}.{action}"),
        ),
        GateError::ProfileProvisioning(message) => {
            tracing::error!(error = %message, "admin profile provisioning failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Authorization error")
        }
    }
}

fn provisioning_failure(err: StoreError) -> Response {
    gate_error_to_response(GateError::ProfileProvisioning(err.to_string()))
}
