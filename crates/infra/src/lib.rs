//! `vitrine-infra` — SQLite persistence for the site backend.
//!
//! One repository per table; row mapping is done by hand against the column
//! names the migration creates. All repositories are cheap to clone (they
//! share the pool).

pub mod admin_profiles;
pub mod contacts;
pub mod db;
pub mod error;
pub mod subscriptions;
pub mod users;

pub use admin_profiles::{AdminProfileFilter, AdminProfileRepo};
pub use contacts::{ContactFilter, ContactRepo};
pub use db::{connect, connect_memory, run_migrations};
pub use error::{StoreError, StoreResult};
pub use subscriptions::{SubscriptionFilter, SubscriptionRepo};
pub use users::{UserFilter, UserRepo};
