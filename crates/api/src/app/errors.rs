//! Consistent JSON error/success envelopes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use vitrine_core::DomainError;
use vitrine_infra::StoreError;

/// `{ "success": false, "message": ... }` with the given status.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// `200 { "success": true, "data": ... }`.
pub fn ok(data: serde_json::Value) -> Response {
    (
        StatusCode::OK,
        axum::Json(json!({ "success": true, "data": data })),
    )
        .into_response()
}

/// `200 { "success": true, "message": ..., "data": ... }`.
pub fn ok_message(message: &str, data: serde_json::Value) -> Response {
    (
        StatusCode::OK,
        axum::Json(json!({ "success": true, "message": message, "data": data })),
    )
        .into_response()
}

/// `201 { "success": true, "message": ..., "data": ... }`.
pub fn created(message: &str, data: serde_json::Value) -> Response {
    (
        StatusCode::CREATED,
        axum::Json(json!({ "success": true, "message": message, "data": data })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        DomainError::InvariantViolation(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "Not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, msg),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "Unauthorized"),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::UniqueViolation => {
            json_error(StatusCode::BAD_REQUEST, "Duplicate value for a unique field")
        }
        other => {
            tracing::error!(error = %other, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
