//! `vitrine-subscriptions` — subscription domain model.

pub mod subscription;

pub use subscription::{PlanType, Subscription, SubscriptionStatus};
