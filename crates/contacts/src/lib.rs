//! `vitrine-contacts` — contact-form intake and triage domain model.

pub mod contact;

pub use contact::{Category, Contact, ContactStatus, Priority};
