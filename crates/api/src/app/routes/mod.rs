use axum::routing::get;
use axum::Router;

pub mod admin;
pub mod auth;
pub mod contacts;
pub mod subscriptions;
pub mod system;

/// Router for everything under `/api/v1`.
///
/// Authentication is enforced per-handler through the `CurrentUser`
/// extractor and the authorization gate helpers, so public and protected
/// endpoints can share path prefixes.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::api_info))
        .nest("/auth", auth::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/contacts", contacts::router())
        .nest("/admin", admin::router())
}
