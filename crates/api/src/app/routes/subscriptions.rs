use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use vitrine_auth::{Action, Resource, Role};
use vitrine_core::{PageQuery, Pagination, SubscriptionId};
use vitrine_infra::SubscriptionFilter;
use vitrine_subscriptions::Subscription;

use crate::app::dto;
use crate::app::errors::{self, json_error};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/newsletter", post(subscribe_newsletter))
        .route("/my", get(my_subscriptions))
        .route("/", post(create_subscription).get(list_subscriptions))
        .route(
            "/:id",
            get(get_subscription)
                .put(update_subscription)
                .delete(delete_subscription),
        )
        .route("/:id/cancel", post(cancel_subscription))
        .route("/:id/renew", post(renew_subscription))
}

/// POST /subscriptions/newsletter - public signup, idempotent per address.
pub async fn subscribe_newsletter(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::NewsletterRequest>,
) -> Response {
    let email = match vitrine_auth::user::validate_email(&body.email) {
        Ok(email) => email,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.subscriptions.find_active_newsletter(&email).await {
        Ok(Some(existing)) => {
            return errors::ok_message(
                "Already subscribed to newsletter",
                json!({ "subscription": dto::subscription_to_json(&existing) }),
            );
        }
        Ok(None) => {}
        Err(e) => return errors::store_error_to_response(e),
    }

    let subscription = Subscription::newsletter(email.clone(), Utc::now());
    if let Err(e) = services.subscriptions.insert(&subscription).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(email = %email, "newsletter subscription created");
    errors::created(
        "Newsletter subscription successful",
        json!({ "subscription": dto::subscription_to_json(&subscription) }),
    )
}

/// GET /subscriptions/my
pub async fn my_subscriptions(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
) -> Response {
    match services.subscriptions.list_for_user(user.0.id).await {
        Ok(subs) => errors::ok(json!({
            "subscriptions": subs.iter().map(dto::subscription_to_json).collect::<Vec<_>>(),
        })),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /subscriptions
pub async fn create_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Json(body): Json<dto::CreateSubscriptionRequest>,
) -> Response {
    match services.subscriptions.find_active_for_user(user.0.id).await {
        Ok(Some(_)) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "User already has an active subscription",
            );
        }
        Ok(None) => {}
        Err(e) => return errors::store_error_to_response(e),
    }

    let subscription = match Subscription::for_user(
        user.0.id,
        body.plan_type,
        body.price,
        body.currency,
        body.end_date,
        body.renewal_date,
        body.payment_method,
        body.payment_id,
        body.is_auto_renewal,
        body.features,
        body.notes,
        Utc::now(),
    ) {
        Ok(subscription) => subscription,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.subscriptions.insert(&subscription).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(subscription_id = %subscription.id, user_id = %user.0.id, "subscription created");
    errors::created(
        "Subscription created successfully",
        json!({ "subscription": dto::subscription_to_json(&subscription) }),
    )
}

/// GET /subscriptions - admins see everything, plain users only their own.
pub async fn list_subscriptions(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Query(query): Query<dto::SubscriptionQuery>,
) -> Response {
    let page = PageQuery { page: query.page, limit: query.limit };
    let filter = SubscriptionFilter {
        user_id: (user.0.role == Role::User).then_some(user.0.id),
        plan_type: query.plan_type,
        status: query.status,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
        page,
    };

    match services.subscriptions.list(&filter).await {
        Ok((subs, total)) => errors::ok(json!({
            "subscriptions": subs.iter().map(dto::subscription_to_json).collect::<Vec<_>>(),
            "pagination": dto::pagination_to_json(&Pagination::new(&page, total)),
        })),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /subscriptions/:id
pub async fn get_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    let (id, found) = match load_scoped(&services, &user, &id).await {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    match found {
        Some(sub) => errors::ok(json!({ "subscription": dto::subscription_to_json(&sub) })),
        None => {
            tracing::debug!(subscription_id = %id, "subscription not visible to caller");
            json_error(StatusCode::NOT_FOUND, "Subscription not found")
        }
    }
}

/// PUT /subscriptions/:id - owners may only touch auto-renewal and notes;
/// moderators/admins may update everything.
pub async fn update_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateSubscriptionRequest>,
) -> Response {
    let (_, found) = match load_scoped(&services, &user, &id).await {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let Some(mut sub) = found else {
        return json_error(StatusCode::NOT_FOUND, "Subscription not found");
    };

    let now = Utc::now();
    if user.0.role == Role::User {
        if let Some(is_auto_renewal) = body.is_auto_renewal {
            sub.is_auto_renewal = is_auto_renewal;
        }
        if let Some(notes) = body.notes {
            sub.notes = Some(notes);
        }
    } else {
        if let Some(plan_type) = body.plan_type {
            sub.plan_type = plan_type;
        }
        if let Some(status) = body.status {
            sub.status = status;
        }
        if body.end_date.is_some() {
            sub.end_date = body.end_date;
        }
        if body.renewal_date.is_some() {
            sub.renewal_date = body.renewal_date;
        }
        if let Some(price) = body.price {
            sub.price = price;
        }
        if let Some(currency) = body.currency {
            if currency.len() != 3 {
                return json_error(StatusCode::BAD_REQUEST, "currency must be a 3-letter code");
            }
            sub.currency = currency;
        }
        if body.payment_method.is_some() {
            sub.payment_method = body.payment_method;
        }
        if body.payment_id.is_some() {
            sub.payment_id = body.payment_id;
        }
        if let Some(is_auto_renewal) = body.is_auto_renewal {
            sub.is_auto_renewal = is_auto_renewal;
        }
        if let Some(features) = body.features {
            sub.features = features;
        }
        if let Some(notes) = body.notes {
            sub.notes = Some(notes);
        }
    }
    sub.updated_at = now;

    if let Err(e) = services.subscriptions.save(&sub).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(subscription_id = %sub.id, "subscription updated");
    errors::ok_message(
        "Subscription updated successfully",
        json!({ "subscription": dto::subscription_to_json(&sub) }),
    )
}

/// POST /subscriptions/:id/cancel
pub async fn cancel_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelSubscriptionRequest>,
) -> Response {
    let (_, found) = match load_scoped(&services, &user, &id).await {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let Some(mut sub) = found else {
        return json_error(StatusCode::NOT_FOUND, "Subscription not found");
    };

    if let Err(e) = sub.cancel(body.reason.as_deref(), Utc::now()) {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.subscriptions.save(&sub).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(subscription_id = %sub.id, "subscription cancelled");
    errors::ok_message(
        "Subscription cancelled successfully",
        json!({ "subscription": dto::subscription_to_json(&sub) }),
    )
}

/// POST /subscriptions/:id/renew
pub async fn renew_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<dto::RenewSubscriptionRequest>,
) -> Response {
    let (_, found) = match load_scoped(&services, &user, &id).await {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let Some(mut sub) = found else {
        return json_error(StatusCode::NOT_FOUND, "Subscription not found");
    };

    sub.renew(body.end_date, body.renewal_date, body.price, body.payment_id, Utc::now());
    if let Err(e) = services.subscriptions.save(&sub).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(subscription_id = %sub.id, "subscription renewed");
    errors::ok_message(
        "Subscription renewed successfully",
        json!({ "subscription": dto::subscription_to_json(&sub) }),
    )
}

/// DELETE /subscriptions/:id - admin-gated with (subscriptions, delete).
pub async fn delete_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    let profile = match authz::require_admin(&services, &user).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };
    if let Err(resp) =
        authz::require_permission(&user, &profile, Resource::Subscriptions, Action::Delete)
    {
        return resp;
    }

    let Ok(id) = id.parse::<SubscriptionId>() else {
        return json_error(StatusCode::BAD_REQUEST, "Invalid subscription id");
    };

    match services.subscriptions.find_by_id(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "Subscription not found"),
        Err(e) => return errors::store_error_to_response(e),
    }

    if let Err(e) = services.subscriptions.delete(id).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(subscription_id = %id, "subscription deleted");
    errors::ok_message("Subscription deleted successfully", serde_json::Value::Null)
}

/// Parse the id and load the row, scoped to the owner for plain users.
async fn load_scoped(
    services: &AppServices,
    user: &CurrentUser,
    raw_id: &str,
) -> Result<(SubscriptionId, Option<Subscription>), Response> {
    let id = raw_id
        .parse::<SubscriptionId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "Invalid subscription id"))?;

    let found = if user.0.role == Role::User {
        services.subscriptions.find_by_id_for_user(id, user.0.id).await
    } else {
        services.subscriptions.find_by_id(id).await
    }
    .map_err(errors::store_error_to_response)?;

    Ok((id, found))
}
