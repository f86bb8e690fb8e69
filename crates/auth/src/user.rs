//! User account model and its validation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrine_core::{DomainError, DomainResult, UserId};

use crate::Role;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 255;

/// A registered account.
///
/// `password_hash` is the argon2 PHC string; it never leaves the backend.
/// API serialization goes through a sanitized DTO instead of this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub email_verification_token: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new account from already-hashed credentials.
    ///
    /// Username/email/format rules are enforced here; uniqueness belongs to
    /// the storage layer.
    pub fn register(
        username: &str,
        email: &str,
        password_hash: String,
        first_name: Option<String>,
        last_name: Option<String>,
        phone_number: Option<String>,
        email_verification_token: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let username = validate_username(username)?;
        let email = validate_email(email)?;

        Ok(Self {
            id: UserId::new(),
            username,
            email,
            password_hash,
            first_name,
            last_name,
            phone_number,
            role: Role::User,
            is_active: true,
            is_email_verified: false,
            email_verification_token,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a profile update; `None` fields keep their current value.
    pub fn update_profile(
        &mut self,
        username: Option<&str>,
        email: Option<&str>,
        first_name: Option<String>,
        last_name: Option<String>,
        phone_number: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(username) = username {
            self.username = validate_username(username)?;
        }
        if let Some(email) = email {
            self.email = validate_email(email)?;
        }
        if let Some(first_name) = first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = last_name {
            self.last_name = Some(last_name);
        }
        if let Some(phone_number) = phone_number {
            self.phone_number = Some(phone_number);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
        self.updated_at = now;
    }
}

/// Normalize and validate a username: 3–50 chars after trimming.
pub fn validate_username(username: &str) -> DomainResult<String> {
    let username = username.trim();
    if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
        return Err(DomainError::validation(format!(
            "username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        )));
    }
    Ok(username.to_string())
}

/// Normalize (trim + lowercase) and validate an email address.
pub fn validate_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}

/// Validate a plaintext password before it is hashed.
pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.len() < PASSWORD_MIN || password.len() > PASSWORD_MAX {
        return Err(DomainError::validation(format!(
            "password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str) -> DomainResult<User> {
        User::register(
            username,
            email,
            "hash".to_string(),
            None,
            None,
            None,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn register_normalizes_email() {
        let user = register("alice", "  Alice@Example.COM ").unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
        assert!(!user.is_email_verified);
    }

    #[test]
    fn register_rejects_bad_email() {
        assert!(register("alice", "not-an-email").is_err());
        assert!(register("alice", "@nodomain").is_err());
        assert!(register("alice", "x@nodot").is_err());
    }

    #[test]
    fn register_rejects_short_username() {
        assert!(register("al", "alice@example.com").is_err());
    }

    #[test]
    fn password_length_rules() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"x".repeat(256)).is_err());
    }

    #[test]
    fn profile_update_keeps_unset_fields() {
        let mut user = register("alice", "alice@example.com").unwrap();
        user.update_profile(None, None, Some("Alice".to_string()), None, None, Utc::now())
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.first_name.as_deref(), Some("Alice"));
        assert!(user.last_name.is_none());
    }

    #[test]
    fn profile_update_validates_new_email() {
        let mut user = register("alice", "alice@example.com").unwrap();
        let result = user.update_profile(None, Some("broken"), None, None, None, Utc::now());
        assert!(result.is_err());
        assert_eq!(user.email, "alice@example.com");
    }
}
