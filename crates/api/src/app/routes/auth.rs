use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use vitrine_auth::{hash_password, validate_password, verify_password, User};

use crate::app::dto;
use crate::app::errors::{self, json_error};
use crate::app::services::AppServices;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", put(change_password))
}

/// POST /auth/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> Response {
    if let Err(e) = validate_password(&body.password) {
        return errors::domain_error_to_response(e);
    }

    let email = match vitrine_auth::user::validate_email(&body.email) {
        Ok(email) => email,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let username = match vitrine_auth::user::validate_username(&body.username) {
        Ok(username) => username,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .users
        .find_by_email_or_username(&email, &username, None)
        .await
    {
        Ok(Some(_)) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "User with this email or username already exists",
            );
        }
        Ok(None) => {}
        Err(e) => return errors::store_error_to_response(e),
    }

    let password_hash = match hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed");
        }
    };

    let verification_token = format!("{}{}", Uuid::now_v7().simple(), Uuid::now_v7().simple());

    let user = match User::register(
        &username,
        &email,
        password_hash,
        body.first_name,
        body.last_name,
        body.phone_number,
        Some(verification_token),
        Utc::now(),
    ) {
        Ok(user) => user,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.users.insert(&user).await {
        return match e {
            vitrine_infra::StoreError::UniqueViolation => json_error(
                StatusCode::BAD_REQUEST,
                "User with this email or username already exists",
            ),
            other => errors::store_error_to_response(other),
        };
    }

    let (token, refresh_token) = match issue_tokens(&services, &user) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    tracing::info!(email = %user.email, "new user registered");

    errors::created(
        "User registered successfully",
        json!({
            "user": dto::user_to_json(&user),
            "token": token,
            "refresh_token": refresh_token,
        }),
    )
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> Response {
    let email = body.email.trim().to_lowercase();

    let user = match services.users.find_by_email(&email).await {
        Ok(user) => user,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut user = match user {
        Some(user) if user.is_active => user,
        _ => {
            return json_error(
                StatusCode::UNAUTHORIZED,
                "Invalid credentials or inactive account",
            );
        }
    };

    match verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return json_error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Err(e) => {
            tracing::error!(error = %e, "password verification failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Login failed");
        }
    }

    user.record_login(Utc::now());
    if let Err(e) = services.users.save(&user).await {
        return errors::store_error_to_response(e);
    }

    let (token, refresh_token) = match issue_tokens(&services, &user) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    tracing::info!(email = %user.email, "user logged in");

    errors::ok_message(
        "Login successful",
        json!({
            "user": dto::user_to_json(&user),
            "token": token,
            "refresh_token": refresh_token,
        }),
    )
}

/// POST /auth/refresh
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RefreshRequest>,
) -> Response {
    let claims = match services.tokens.decode_refresh(&body.refresh_token) {
        Ok(claims) => claims,
        Err(_) => return json_error(StatusCode::UNAUTHORIZED, "Invalid refresh token"),
    };

    let user = match services.users.find_by_id(claims.sub).await {
        Ok(user) => user,
        Err(e) => return errors::store_error_to_response(e),
    };

    let user = match user {
        Some(user) if user.is_active => user,
        _ => return json_error(StatusCode::UNAUTHORIZED, "Invalid refresh token"),
    };

    let (token, refresh_token) = match issue_tokens(&services, &user) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    errors::ok(json!({ "token": token, "refresh_token": refresh_token }))
}

/// POST /auth/logout - stateless tokens, so this only logs the event.
pub async fn logout(user: CurrentUser) -> Response {
    tracing::info!(email = %user.0.email, "user logged out");
    errors::ok_message("Logged out successfully", serde_json::Value::Null)
}

/// GET /auth/profile
pub async fn get_profile(user: CurrentUser) -> Response {
    errors::ok(json!({ "user": dto::user_to_json(&user.0) }))
}

/// PUT /auth/profile
pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Json(body): Json<dto::UpdateProfileRequest>,
) -> Response {
    let mut user = user.0;

    // Re-check uniqueness when the caller changes email or username.
    let next_email = body.email.as_deref().map(str::trim).map(str::to_lowercase);
    let next_username = body.username.as_deref().map(str::trim);
    let identity_changed = next_email.as_deref().is_some_and(|e| e != user.email)
        || next_username.is_some_and(|u| u != user.username);

    if identity_changed {
        let email = next_email.as_deref().unwrap_or(&user.email);
        let username = next_username.unwrap_or(&user.username);
        match services
            .users
            .find_by_email_or_username(email, username, Some(user.id))
            .await
        {
            Ok(Some(_)) => {
                return json_error(StatusCode::BAD_REQUEST, "Email or username already exists");
            }
            Ok(None) => {}
            Err(e) => return errors::store_error_to_response(e),
        }
    }

    if let Err(e) = user.update_profile(
        body.username.as_deref(),
        body.email.as_deref(),
        body.first_name,
        body.last_name,
        body.phone_number,
        Utc::now(),
    ) {
        return errors::domain_error_to_response(e);
    }

    if let Err(e) = services.users.save(&user).await {
        return match e {
            vitrine_infra::StoreError::UniqueViolation => {
                json_error(StatusCode::BAD_REQUEST, "Email or username already exists")
            }
            other => errors::store_error_to_response(other),
        };
    }

    tracing::info!(email = %user.email, "profile updated");
    errors::ok_message(
        "Profile updated successfully",
        json!({ "user": dto::user_to_json(&user) }),
    )
}

/// PUT /auth/change-password
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Json(body): Json<dto::ChangePasswordRequest>,
) -> Response {
    let mut user = user.0;

    match verify_password(&body.current_password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return json_error(StatusCode::BAD_REQUEST, "Current password is incorrect");
        }
        Err(e) => {
            tracing::error!(error = %e, "password verification failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change password");
        }
    }

    if let Err(e) = validate_password(&body.new_password) {
        return errors::domain_error_to_response(e);
    }

    user.password_hash = match hash_password(&body.new_password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change password");
        }
    };
    user.updated_at = Utc::now();

    if let Err(e) = services.users.save(&user).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(email = %user.email, "password changed");
    errors::ok_message("Password changed successfully", serde_json::Value::Null)
}

fn issue_tokens(services: &AppServices, user: &User) -> Result<(String, String), Response> {
    let now = Utc::now();
    let token = services
        .tokens
        .issue_access(user.id, &user.email, user.role, now);
    let refresh = services.tokens.issue_refresh(user.id, now);

    match (token, refresh) {
        (Ok(token), Ok(refresh)) => Ok((token, refresh)),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "token issuance failed");
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to issue tokens",
            ))
        }
    }
}
