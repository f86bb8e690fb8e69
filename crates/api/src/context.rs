//! Request-scoped identity extractors.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::Response;

use vitrine_auth::{Principal, User};

use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::middleware::authenticate;

/// The authenticated caller. Extracting it rejects the request with 401 when
/// no valid bearer token resolves to an active account.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Gate-facing view of this user.
    pub fn principal(&self) -> Principal {
        Principal::new(self.0.id, self.0.role)
    }
}

/// Like [`CurrentUser`], but absent instead of rejecting: used by public
/// endpoints that accept either anonymous or signed-in submissions.
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<User>);

fn services_from(parts: &Parts) -> Result<Arc<AppServices>, Response> {
    parts
        .extensions
        .get::<Arc<AppServices>>()
        .cloned()
        .ok_or_else(|| {
            tracing::error!("AppServices extension missing from request");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Server misconfigured")
        })
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let services = services_from(parts)?;
        let user = authenticate(&services, &parts.headers).await?;
        Ok(CurrentUser(user))
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let services = services_from(parts)?;
        Ok(MaybeUser(
            authenticate(&services, &parts.headers).await.ok(),
        ))
    }
}
