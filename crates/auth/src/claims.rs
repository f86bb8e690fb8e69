//! JWT claims model and HS256 token codec.
//!
//! Access and refresh tokens are signed with separate secrets; a decoded
//! token is additionally checked against the kind the caller expected, so a
//! refresh token can never stand in for an access token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vitrine_core::UserId;

use crate::Role;

/// Which secret a token was signed with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both token kinds.
///
/// Access tokens embed email and role for logging convenience; the HTTP
/// layer still re-loads the user row on every request, so neither field is
/// trusted for authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id.
    pub sub: UserId,

    pub kind: TokenKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiration, seconds since the epoch.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token kind mismatch")]
    WrongKind,

    #[error("invalid token")]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for TokenValidationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid,
        }
    }
}

/// HS256 encoder/decoder for the two token kinds.
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue_access(
        &self,
        user_id: UserId,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenValidationError> {
        let claims = JwtClaims {
            sub: user_id,
            kind: TokenKind::Access,
            email: Some(email.to_string()),
            role: Some(role),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        self.encode(&claims, &self.access_encoding)
    }

    pub fn issue_refresh(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<String, TokenValidationError> {
        let claims = JwtClaims {
            sub: user_id,
            kind: TokenKind::Refresh,
            email: None,
            role: None,
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };
        self.encode(&claims, &self.refresh_encoding)
    }

    pub fn decode_access(&self, token: &str) -> Result<JwtClaims, TokenValidationError> {
        self.decode(token, &self.access_decoding, TokenKind::Access)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<JwtClaims, TokenValidationError> {
        self.decode(token, &self.refresh_decoding, TokenKind::Refresh)
    }

    fn encode(
        &self,
        claims: &JwtClaims,
        key: &EncodingKey,
    ) -> Result<String, TokenValidationError> {
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, key)?)
    }

    fn decode(
        &self,
        token: &str,
        key: &DecodingKey,
        expected: TokenKind,
    ) -> Result<JwtClaims, TokenValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<JwtClaims>(token, key, &validation)?;
        if data.claims.kind != expected {
            return Err(TokenValidationError::WrongKind);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(
            b"access-secret",
            b"refresh-secret",
            Duration::minutes(10),
            Duration::days(30),
        )
    }

    #[test]
    fn access_token_round_trips() {
        let codec = codec();
        let user_id = UserId::new();
        let token = codec
            .issue_access(user_id, "alice@example.com", Role::Admin, Utc::now())
            .unwrap();

        let claims = codec.decode_access(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.role, Some(Role::Admin));
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let codec = codec();
        let token = codec.issue_refresh(UserId::new(), Utc::now()).unwrap();

        // Signed with the refresh secret, so the access decoder rejects it.
        assert!(codec.decode_access(&token).is_err());
        assert_eq!(codec.decode_refresh(&token).unwrap().kind, TokenKind::Refresh);
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec();
        let issued = Utc::now() - Duration::hours(1);
        let token = codec
            .issue_access(UserId::new(), "a@b.c", Role::User, issued)
            .unwrap();

        assert_eq!(
            codec.decode_access(&token).unwrap_err(),
            TokenValidationError::Expired,
        );
    }

    #[test]
    fn garbage_token_is_invalid() {
        let codec = codec();
        assert_eq!(
            codec.decode_access("not-a-jwt").unwrap_err(),
            TokenValidationError::Invalid,
        );
    }
}
