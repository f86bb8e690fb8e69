//! Bearer-token authentication shared by the request extractors.

use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use vitrine_auth::{TokenValidationError, User};

use crate::app::errors::json_error;
use crate::app::services::AppServices;

/// Resolve the bearer token in `headers` to an active user account.
///
/// The decoded claims are only trusted for the user id; role and activity
/// come from the freshly-loaded row, so a stale token cannot outlive a
/// deactivation or demotion.
pub async fn authenticate(services: &AppServices, headers: &HeaderMap) -> Result<User, Response> {
    let token = extract_bearer(headers)
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "Access token is required"))?;

    let claims = services.tokens.decode_access(token).map_err(|err| {
        let message = match err {
            TokenValidationError::Expired => "Token expired",
            _ => "Invalid token",
        };
        json_error(StatusCode::UNAUTHORIZED, message)
    })?;

    let user = services
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to load user for authentication");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
        })?;

    match user {
        Some(user) if user.is_active => Ok(user),
        _ => Err(json_error(StatusCode::UNAUTHORIZED, "Invalid or inactive user")),
    }
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer(&headers_with("Bearer   abc  ")), Some("abc"));
        assert_eq!(extract_bearer(&headers_with("Basic abc")), None);
        assert_eq!(extract_bearer(&headers_with("Bearer ")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
