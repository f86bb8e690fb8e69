//! `vitrine-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the gate
//! decides, callers load and persist.

pub mod access;
pub mod admin_profile;
pub mod claims;
pub mod gate;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use access::AccessLevel;
pub use admin_profile::AdminProfile;
pub use claims::{JwtClaims, TokenCodec, TokenKind, TokenValidationError};
pub use gate::{check_permission, check_role, GateError, Principal};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::{Action, ActionSet, PermissionGrid, Resource};
pub use roles::Role;
pub use user::{validate_password, User};
