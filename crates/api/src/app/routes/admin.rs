use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{Datelike, TimeZone, Utc};
use serde_json::json;

use vitrine_auth::{Action, AdminProfile, Resource, Role, User};
use vitrine_contacts::ContactStatus;
use vitrine_core::{AdminProfileId, PageQuery, Pagination, UserId};
use vitrine_infra::{AdminProfileFilter, StoreError, UserFilter};
use vitrine_subscriptions::SubscriptionStatus;

use crate::app::dto;
use crate::app::errors::{self, json_error};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/access", post(update_last_access))
        .route("/users", get(get_users))
        .route(
            "/users/:id",
            get(get_user_by_id).put(update_user).delete(delete_user),
        )
        .route("/", post(create_admin).get(get_admins))
        .route("/user/:user_id", get(get_admin_by_user))
        .route("/:id", get(get_admin_by_id).put(update_admin).delete(delete_admin))
        .route("/:id/permissions", put(update_admin_permissions))
}

/// GET /admin/dashboard/stats - admin only.
pub async fn dashboard_stats(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
) -> Response {
    if let Err(resp) = authz::require_admin(&services, &user).await {
        return resp;
    }

    let now = Utc::now();
    let month_start = Utc
        .with_ymd_and_hms(now.date_naive().year(), now.date_naive().month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);

    let stats = async {
        let total_users = services.users.count().await?;
        let active_users = services.users.count_active().await?;
        let new_users = services.users.count_created_since(month_start).await?;

        let total_subs = services.subscriptions.count().await?;
        let active_subs = services
            .subscriptions
            .count_by_status(SubscriptionStatus::Active)
            .await?;
        let revenue = services.subscriptions.revenue_active().await?;

        let total_contacts = services.contacts.count().await?;
        let new_contacts = services.contacts.count_by_status(ContactStatus::New).await?;
        let resolved_contacts = services
            .contacts
            .count_by_status(ContactStatus::Resolved)
            .await?;

        let total_admins = services.admin_profiles.count().await?;
        let active_admins = services.admin_profiles.count_active().await?;

        Ok::<_, StoreError>(json!({
            "users": {
                "total": total_users,
                "active": active_users,
                "new_this_month": new_users,
            },
            "subscriptions": {
                "total": total_subs,
                "active": active_subs,
                "revenue": revenue,
            },
            "contacts": {
                "total": total_contacts,
                "new": new_contacts,
                "resolved": resolved_contacts,
                "resolution_rate": if total_contacts > 0 {
                    format!("{:.2}", (resolved_contacts as f64 / total_contacts as f64) * 100.0)
                } else {
                    "0".to_string()
                },
            },
            "admins": {
                "total": total_admins,
                "active": active_admins,
            },
        }))
    };

    match stats.await {
        Ok(data) => errors::ok(data),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /admin/access - stamp the caller's profile with the access time.
pub async fn update_last_access(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
) -> Response {
    let mut profile = match authz::require_admin(&services, &user).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };

    profile.touch_access(Utc::now());
    if let Err(e) = services.admin_profiles.save(&profile).await {
        return errors::store_error_to_response(e);
    }

    errors::ok_message("Last access time updated", serde_json::Value::Null)
}

/// GET /admin/users - admin only.
pub async fn get_users(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Query(query): Query<dto::UserQuery>,
) -> Response {
    if let Err(resp) = authz::require_admin(&services, &user).await {
        return resp;
    }

    let page = PageQuery { page: query.page, limit: query.limit };
    let filter = UserFilter {
        search: query.search,
        is_active: query.is_active,
        role: query.role,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
        page,
    };

    let (users, total) = match services.users.list(&filter).await {
        Ok(result) => result,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut items = Vec::with_capacity(users.len());
    for listed in &users {
        let profile = if listed.role == Role::Admin {
            match services.admin_profiles.find_by_user_id(listed.id).await {
                Ok(profile) => profile,
                Err(e) => return errors::store_error_to_response(e),
            }
        } else {
            None
        };

        let mut item = dto::user_to_json(listed);
        item["admin_profile"] = profile
            .as_ref()
            .map(|p| {
                json!({
                    "id": p.id,
                    "access_level": p.access_level,
                    "department": p.department,
                    "position": p.position,
                    "is_active": p.is_active,
                })
            })
            .unwrap_or(serde_json::Value::Null);
        items.push(item);
    }

    errors::ok(json!({
        "users": items,
        "pagination": dto::pagination_to_json(&Pagination::new(&page, total)),
    }))
}

/// GET /admin/users/:id - admin only.
pub async fn get_user_by_id(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = authz::require_admin(&services, &user).await {
        return resp;
    }

    let target = match load_user(&services, &id).await {
        Ok(target) => target,
        Err(resp) => return resp,
    };

    let profile = match services.admin_profiles.find_by_user_id(target.id).await {
        Ok(profile) => profile,
        Err(e) => return errors::store_error_to_response(e),
    };

    let subscriptions = match services.subscriptions.list_for_user(target.id).await {
        Ok(subs) => subs,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut payload = dto::user_to_json(&target);
    payload["admin_profile"] = profile
        .as_ref()
        .map(|p| dto::admin_to_json(p, None))
        .unwrap_or(serde_json::Value::Null);
    payload["subscriptions"] = subscriptions
        .iter()
        .take(5)
        .map(dto::subscription_to_json)
        .collect::<Vec<_>>()
        .into();

    errors::ok(json!({ "user": payload }))
}

/// PUT /admin/users/:id - admin only; activity flag and role.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<dto::AdminUserUpdateRequest>,
) -> Response {
    if let Err(resp) = authz::require_admin(&services, &user).await {
        return resp;
    }

    let mut target = match load_user(&services, &id).await {
        Ok(target) => target,
        Err(resp) => return resp,
    };

    if let Some(is_active) = body.is_active {
        target.is_active = is_active;
    }
    if let Some(role) = body.role {
        target.role = role;
    }
    target.updated_at = Utc::now();

    if let Err(e) = services.users.save(&target).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(user_id = %target.id, "user updated by admin");
    errors::ok_message(
        "User updated successfully",
        json!({ "user": dto::user_to_json(&target) }),
    )
}

/// DELETE /admin/users/:id - admin only; cascades profile, subscriptions and
/// contact assignments.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = authz::require_admin(&services, &user).await {
        return resp;
    }

    let target = match load_user(&services, &id).await {
        Ok(target) => target,
        Err(resp) => return resp,
    };

    let cascade = async {
        if target.role == Role::Admin {
            services.admin_profiles.delete_by_user_id(target.id).await?;
        }
        services.subscriptions.delete_for_user(target.id).await?;
        services.contacts.unassign_user(target.id).await?;
        services.users.delete(target.id).await
    };

    if let Err(e) = cascade.await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(user_id = %target.id, "user deleted by admin");
    errors::ok_message("User deleted successfully", serde_json::Value::Null)
}

/// POST /admin - admin + (admin, write); promotes the target user.
pub async fn create_admin(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Json(body): Json<dto::CreateAdminRequest>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Write).await {
        return resp;
    }

    let target = match load_user(&services, &body.user_id).await {
        Ok(target) => target,
        Err(resp) => return resp,
    };

    match services.admin_profiles.find_by_user_id(target.id).await {
        Ok(Some(_)) => return json_error(StatusCode::BAD_REQUEST, "User is already an admin"),
        Ok(None) => {}
        Err(e) => return errors::store_error_to_response(e),
    }

    let profile = AdminProfile::created_by_admin(
        target.id,
        body.access_level,
        body.permissions,
        body.department,
        body.position,
        body.notes,
        user.0.id,
        Utc::now(),
    );

    if let Err(e) = services.admin_profiles.insert(&profile).await {
        return match e {
            StoreError::UniqueViolation => {
                json_error(StatusCode::BAD_REQUEST, "User is already an admin")
            }
            other => errors::store_error_to_response(other),
        };
    }

    if let Err(e) = services.users.update_role(target.id, Role::Admin, Utc::now()).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(admin_id = %profile.id, user_id = %target.id, "admin created");
    errors::created(
        "Admin created successfully",
        json!({ "admin": dto::admin_to_json(&profile, Some(&target)) }),
    )
}

/// GET /admin - admin + (admin, read).
pub async fn get_admins(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Query(query): Query<dto::AdminQuery>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Read).await {
        return resp;
    }

    let page = PageQuery { page: query.page, limit: query.limit };
    let filter = AdminProfileFilter {
        access_level: query.access_level,
        is_active: query.is_active,
        department: query.department,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
        page,
    };

    let (profiles, total) = match services.admin_profiles.list(&filter).await {
        Ok(result) => result,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut items = Vec::with_capacity(profiles.len());
    for profile in &profiles {
        let owner = match services.users.find_by_id(profile.user_id).await {
            Ok(owner) => owner,
            Err(e) => return errors::store_error_to_response(e),
        };
        items.push(dto::admin_to_json(profile, owner.as_ref()));
    }

    errors::ok(json!({
        "admins": items,
        "pagination": dto::pagination_to_json(&Pagination::new(&page, total)),
    }))
}

/// GET /admin/:id - admin + (admin, read).
pub async fn get_admin_by_id(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Read).await {
        return resp;
    }

    let profile = match load_profile(&services, &id).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };

    let owner = match services.users.find_by_id(profile.user_id).await {
        Ok(owner) => owner,
        Err(e) => return errors::store_error_to_response(e),
    };

    errors::ok(json!({ "admin": dto::admin_to_json(&profile, owner.as_ref()) }))
}

/// GET /admin/user/:user_id - admin + (admin, read).
pub async fn get_admin_by_user(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(user_id): Path<String>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Read).await {
        return resp;
    }

    let Ok(user_id) = user_id.parse::<UserId>() else {
        return json_error(StatusCode::BAD_REQUEST, "Invalid user id");
    };

    let profile = match services.admin_profiles.find_by_user_id(user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "Admin profile not found"),
        Err(e) => return errors::store_error_to_response(e),
    };

    let owner = match services.users.find_by_id(profile.user_id).await {
        Ok(owner) => owner,
        Err(e) => return errors::store_error_to_response(e),
    };

    errors::ok(json!({ "admin": dto::admin_to_json(&profile, owner.as_ref()) }))
}

/// PUT /admin/:id - admin + (admin, write).
pub async fn update_admin(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateAdminRequest>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Write).await {
        return resp;
    }

    let mut profile = match load_profile(&services, &id).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };

    if let Some(permissions) = body.permissions {
        profile.permissions = permissions;
    }
    if body.department.is_some() {
        profile.department = body.department;
    }
    if body.position.is_some() {
        profile.position = body.position;
    }
    if let Some(access_level) = body.access_level {
        profile.access_level = access_level;
    }
    if let Some(is_active) = body.is_active {
        profile.is_active = is_active;
    }
    if body.notes.is_some() {
        profile.notes = body.notes;
    }
    profile.updated_at = Utc::now();

    if let Err(e) = services.admin_profiles.save(&profile).await {
        return errors::store_error_to_response(e);
    }

    // Changing the access level re-asserts the owning account's admin role.
    if body.access_level.is_some() {
        if let Err(e) = services
            .users
            .update_role(profile.user_id, Role::Admin, Utc::now())
            .await
        {
            return errors::store_error_to_response(e);
        }
    }

    let owner = match services.users.find_by_id(profile.user_id).await {
        Ok(owner) => owner,
        Err(e) => return errors::store_error_to_response(e),
    };

    tracing::info!(admin_id = %profile.id, "admin updated");
    errors::ok_message(
        "Admin updated successfully",
        json!({ "admin": dto::admin_to_json(&profile, owner.as_ref()) }),
    )
}

/// PUT /admin/:id/permissions - admin + (admin, write); grid only.
pub async fn update_admin_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdatePermissionsRequest>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Write).await {
        return resp;
    }

    let mut profile = match load_profile(&services, &id).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };

    profile.permissions = body.permissions;
    profile.updated_at = Utc::now();

    if let Err(e) = services.admin_profiles.save(&profile).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(admin_id = %profile.id, "admin permissions updated");
    errors::ok_message(
        "Admin permissions updated successfully",
        json!({ "admin": dto::admin_to_json(&profile, None) }),
    )
}

/// DELETE /admin/:id - admin + (admin, delete); demotion reverts the owning
/// account to the plain user role.
pub async fn delete_admin(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Delete).await {
        return resp;
    }

    let profile = match load_profile(&services, &id).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };

    if let Err(e) = services
        .users
        .update_role(profile.user_id, Role::User, Utc::now())
        .await
    {
        return errors::store_error_to_response(e);
    }
    if let Err(e) = services.admin_profiles.delete(profile.id).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(admin_id = %profile.id, user_id = %profile.user_id, "admin deleted");
    errors::ok_message("Admin deleted successfully", serde_json::Value::Null)
}

async fn gate(
    services: &AppServices,
    user: &CurrentUser,
    action: Action,
) -> Result<AdminProfile, Response> {
    let profile = authz::require_admin(services, user).await?;
    authz::require_permission(user, &profile, Resource::Admin, action)?;
    Ok(profile)
}

async fn load_user(services: &AppServices, raw_id: &str) -> Result<User, Response> {
    let id = raw_id
        .parse::<UserId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "Invalid user id"))?;

    services
        .users
        .find_by_id(id)
        .await
        .map_err(errors::store_error_to_response)?
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "User not found"))
}

async fn load_profile(services: &AppServices, raw_id: &str) -> Result<AdminProfile, Response> {
    let id = raw_id
        .parse::<AdminProfileId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "Invalid admin id"))?;

    services
        .admin_profiles
        .find_by_id(id)
        .await
        .map_err(errors::store_error_to_response)?
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "Admin not found"))
}
