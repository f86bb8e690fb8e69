use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// GET /health - liveness probe, no auth.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// GET /api/v1 - API info envelope.
pub async fn api_info() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Vitrine Backend API",
            "version": env!("CARGO_PKG_VERSION"),
            "status": "Running",
            "endpoints": {
                "auth": "/api/v1/auth",
                "subscriptions": "/api/v1/subscriptions",
                "contacts": "/api/v1/contacts",
                "admin": "/api/v1/admin",
            },
        })),
    )
}
