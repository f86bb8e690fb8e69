use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use vitrine_auth::{Action, AdminProfile, Resource};
use vitrine_contacts::{Contact, ContactStatus};
use vitrine_core::{ContactId, PageQuery, Pagination, UserId};
use vitrine_infra::ContactFilter;

use crate::app::dto;
use crate::app::errors::{self, json_error};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{CurrentUser, MaybeUser};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_contact).get(list_contacts))
        .route("/assigned", get(my_assigned_contacts))
        .route("/stats", get(contact_stats))
        .route("/:id", get(get_contact).put(update_contact).delete(delete_contact))
        .route("/:id/respond", post(respond_to_contact))
        .route("/:id/assign", post(assign_contact))
}

/// POST /contacts - public submission; a signed-in caller is accepted but
/// not required.
pub async fn create_contact(
    Extension(services): Extension<Arc<AppServices>>,
    _user: MaybeUser,
    headers: HeaderMap,
    Json(body): Json<dto::CreateContactRequest>,
) -> Response {
    let ip_address = client_ip(&headers);
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let contact = match Contact::submit(
        &body.name,
        &body.email,
        body.phone_number,
        body.company,
        &body.subject,
        &body.message,
        body.category,
        body.priority,
        ip_address,
        user_agent,
        Utc::now(),
    ) {
        Ok(contact) => contact,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.contacts.insert(&contact).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(contact_id = %contact.id, email = %contact.email, "contact submitted");
    errors::created(
        "Contact request submitted successfully",
        json!({ "contact": dto::contact_to_json(&contact) }),
    )
}

/// GET /contacts - admin + (contacts, read).
pub async fn list_contacts(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Query(query): Query<dto::ContactQuery>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Read).await {
        return resp;
    }

    let page = PageQuery { page: query.page, limit: query.limit };
    let filter = ContactFilter {
        category: query.category,
        status: query.status,
        priority: query.priority,
        search: query.search,
        assigned_to: None,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
        page,
    };

    match services.contacts.list(&filter).await {
        Ok((contacts, total)) => errors::ok(json!({
            "contacts": contacts.iter().map(dto::contact_to_json).collect::<Vec<_>>(),
            "pagination": dto::pagination_to_json(&Pagination::new(&page, total)),
        })),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /contacts/assigned - the caller's own triage queue (admin only, no
/// per-resource permission needed).
pub async fn my_assigned_contacts(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Query(query): Query<dto::AssignedContactsQuery>,
) -> Response {
    if let Err(resp) = authz::require_admin(&services, &user).await {
        return resp;
    }

    let page = PageQuery { page: query.page, limit: query.limit };
    let filter = ContactFilter {
        status: query.status,
        priority: query.priority,
        assigned_to: Some(user.0.id),
        page,
        ..Default::default()
    };

    match services.contacts.list(&filter).await {
        Ok((contacts, total)) => errors::ok(json!({
            "contacts": contacts.iter().map(dto::contact_to_json).collect::<Vec<_>>(),
            "pagination": dto::pagination_to_json(&Pagination::new(&page, total)),
        })),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /contacts/stats - admin + (contacts, read).
pub async fn contact_stats(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Read).await {
        return resp;
    }

    let totals = async {
        let total = services.contacts.count().await?;
        let new = services.contacts.count_by_status(ContactStatus::New).await?;
        let in_progress = services
            .contacts
            .count_by_status(ContactStatus::InProgress)
            .await?;
        let resolved = services
            .contacts
            .count_by_status(ContactStatus::Resolved)
            .await?;
        let closed = services.contacts.count_by_status(ContactStatus::Closed).await?;
        Ok::<_, vitrine_infra::StoreError>((total, new, in_progress, resolved, closed))
    };

    match totals.await {
        Ok((total, new, in_progress, resolved, closed)) => {
            let resolution_rate = if total > 0 {
                (resolved as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            errors::ok(json!({
                "total": total,
                "new": new,
                "in_progress": in_progress,
                "resolved": resolved,
                "closed": closed,
                "resolution_rate": format!("{resolution_rate:.2}"),
            }))
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /contacts/:id - admin + (contacts, read).
pub async fn get_contact(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Read).await {
        return resp;
    }

    match load_contact(&services, &id).await {
        Ok(contact) => errors::ok(json!({ "contact": dto::contact_to_json(&contact) })),
        Err(resp) => resp,
    }
}

/// PUT /contacts/:id - admin + (contacts, write).
pub async fn update_contact(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateContactRequest>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Write).await {
        return resp;
    }

    let mut contact = match load_contact(&services, &id).await {
        Ok(contact) => contact,
        Err(resp) => return resp,
    };

    let now = Utc::now();
    if let Some(priority) = body.priority {
        contact.priority = priority;
    }
    if let Some(assigned_to) = &body.assigned_to {
        let assignee = match resolve_user(&services, assigned_to).await {
            Ok(assignee) => assignee,
            Err(resp) => return resp,
        };
        contact.assigned_to = Some(assignee);
    }
    if let Some(response_message) = body.response_message {
        contact.response_message = Some(response_message);
        contact.responded_at = Some(now);
    }
    if let Some(status) = body.status {
        contact.set_status(status, now);
    } else {
        contact.updated_at = now;
    }

    if let Err(e) = services.contacts.save(&contact).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(contact_id = %contact.id, "contact updated");
    errors::ok_message(
        "Contact updated successfully",
        json!({ "contact": dto::contact_to_json(&contact) }),
    )
}

/// POST /contacts/:id/respond - admin + (contacts, write).
pub async fn respond_to_contact(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<dto::RespondToContactRequest>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Write).await {
        return resp;
    }

    let mut contact = match load_contact(&services, &id).await {
        Ok(contact) => contact,
        Err(resp) => return resp,
    };

    contact.respond(body.response_message, body.status, Utc::now());

    if let Err(e) = services.contacts.save(&contact).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(contact_id = %contact.id, "contact response recorded");
    errors::ok_message(
        "Response recorded successfully",
        json!({ "contact": dto::contact_to_json(&contact) }),
    )
}

/// POST /contacts/:id/assign - admin + (contacts, write).
pub async fn assign_contact(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<dto::AssignContactRequest>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Write).await {
        return resp;
    }

    let mut contact = match load_contact(&services, &id).await {
        Ok(contact) => contact,
        Err(resp) => return resp,
    };

    let assignee = match resolve_user(&services, &body.assigned_to).await {
        Ok(assignee) => assignee,
        Err(resp) => return resp,
    };

    contact.assign(assignee, Utc::now());

    if let Err(e) = services.contacts.save(&contact).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(contact_id = %contact.id, assignee = %assignee, "contact assigned");
    errors::ok_message(
        "Contact assigned successfully",
        json!({ "contact": dto::contact_to_json(&contact) }),
    )
}

/// DELETE /contacts/:id - admin + (contacts, delete).
pub async fn delete_contact(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = gate(&services, &user, Action::Delete).await {
        return resp;
    }

    let contact = match load_contact(&services, &id).await {
        Ok(contact) => contact,
        Err(resp) => return resp,
    };

    if let Err(e) = services.contacts.delete(contact.id).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(contact_id = %contact.id, "contact deleted");
    errors::ok_message("Contact deleted successfully", serde_json::Value::Null)
}

/// Role + profile + (contacts, `action`) stages in one call.
async fn gate(
    services: &AppServices,
    user: &CurrentUser,
    action: Action,
) -> Result<AdminProfile, Response> {
    let profile = authz::require_admin(services, user).await?;
    authz::require_permission(user, &profile, Resource::Contacts, action)?;
    Ok(profile)
}

async fn load_contact(services: &AppServices, raw_id: &str) -> Result<Contact, Response> {
    let id = raw_id
        .parse::<ContactId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "Invalid contact id"))?;

    services
        .contacts
        .find_by_id(id)
        .await
        .map_err(errors::store_error_to_response)?
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "Contact not found"))
}

async fn resolve_user(services: &AppServices, raw_id: &str) -> Result<UserId, Response> {
    let id = raw_id
        .parse::<UserId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "Invalid user id"))?;

    services
        .users
        .find_by_id(id)
        .await
        .map_err(errors::store_error_to_response)?
        .map(|user| user.id)
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "Assigned user not found"))
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
