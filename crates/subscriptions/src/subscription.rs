//! Subscription records: paid plans for registered users plus anonymous
//! newsletter signups.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitrine_core::{DomainError, DomainResult, SubscriptionId, UserId};

/// Plan tier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    #[default]
    Basic,
    Premium,
    Enterprise,
    Newsletter,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Basic => "basic",
            PlanType::Premium => "premium",
            PlanType::Enterprise => "enterprise",
            PlanType::Newsletter => "newsletter",
        }
    }
}

impl core::fmt::Display for PlanType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(PlanType::Basic),
            "premium" => Ok(PlanType::Premium),
            "enterprise" => Ok(PlanType::Enterprise),
            "newsletter" => Ok(PlanType::Newsletter),
            other => Err(DomainError::validation(format!("unknown plan type '{other}'"))),
        }
    }
}

/// Subscription lifecycle state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Inactive,
    Cancelled,
    Expired,
    Suspended,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Suspended => "suspended",
        }
    }
}

impl core::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "inactive" => Ok(SubscriptionStatus::Inactive),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            "suspended" => Ok(SubscriptionStatus::Suspended),
            other => Err(DomainError::validation(format!(
                "unknown subscription status '{other}'"
            ))),
        }
    }
}

/// A subscription row.
///
/// Exactly one of `user_id` / `email` identifies the subscriber: paid plans
/// hang off an account, newsletter signups only carry an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
    pub price: Decimal,
    pub currency: String,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub is_auto_renewal: bool,
    pub features: serde_json::Value,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Anonymous newsletter signup: free, active immediately.
    pub fn newsletter(email: String, now: DateTime<Utc>) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id: None,
            email: Some(email),
            plan_type: PlanType::Newsletter,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: None,
            renewal_date: None,
            price: Decimal::ZERO,
            currency: "USD".to_string(),
            payment_method: None,
            payment_id: None,
            is_auto_renewal: true,
            features: serde_json::Value::Object(serde_json::Map::new()),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Paid plan for a registered user.
    #[allow(clippy::too_many_arguments)]
    pub fn for_user(
        user_id: UserId,
        plan_type: PlanType,
        price: Decimal,
        currency: Option<String>,
        end_date: Option<DateTime<Utc>>,
        renewal_date: Option<DateTime<Utc>>,
        payment_method: Option<String>,
        payment_id: Option<String>,
        is_auto_renewal: bool,
        features: Option<serde_json::Value>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let currency = currency.unwrap_or_else(|| "USD".to_string());
        if currency.len() != 3 {
            return Err(DomainError::validation("currency must be a 3-letter code"));
        }
        if price < Decimal::ZERO {
            return Err(DomainError::validation("price cannot be negative"));
        }

        Ok(Self {
            id: SubscriptionId::new(),
            user_id: Some(user_id),
            email: None,
            plan_type,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date,
            renewal_date,
            price,
            currency,
            payment_method,
            payment_id,
            is_auto_renewal,
            features: features.unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Cancel the subscription, appending the reason to its notes.
    pub fn cancel(&mut self, reason: Option<&str>, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == SubscriptionStatus::Cancelled {
            return Err(DomainError::invariant("subscription is already cancelled"));
        }

        self.status = SubscriptionStatus::Cancelled;
        if let Some(reason) = reason {
            let existing = self.notes.take().unwrap_or_default();
            self.notes = Some(format!("{existing}\nCancellation reason: {reason}"));
        }
        self.updated_at = now;
        Ok(())
    }

    /// Reactivate, refreshing dates and optionally price/payment reference.
    pub fn renew(
        &mut self,
        end_date: Option<DateTime<Utc>>,
        renewal_date: Option<DateTime<Utc>>,
        price: Option<Decimal>,
        payment_id: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = SubscriptionStatus::Active;
        if end_date.is_some() {
            self.end_date = end_date;
        }
        if renewal_date.is_some() {
            self.renewal_date = renewal_date;
        }
        if let Some(price) = price {
            self.price = price;
        }
        if payment_id.is_some() {
            self.payment_id = payment_id;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newsletter_defaults() {
        let sub = Subscription::newsletter("reader@example.com".to_string(), Utc::now());
        assert_eq!(sub.plan_type, PlanType::Newsletter);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.price, Decimal::ZERO);
        assert!(sub.user_id.is_none());
    }

    #[test]
    fn paid_plan_rejects_bad_currency() {
        let result = Subscription::for_user(
            UserId::new(),
            PlanType::Premium,
            Decimal::new(999, 2),
            Some("DOLLARS".to_string()),
            None,
            None,
            None,
            None,
            true,
            None,
            None,
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn cancel_appends_reason_and_is_not_repeatable() {
        let mut sub = Subscription::newsletter("reader@example.com".to_string(), Utc::now());

        sub.cancel(Some("too many emails"), Utc::now()).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(sub.notes.as_deref().unwrap().contains("too many emails"));

        assert!(sub.cancel(None, Utc::now()).is_err());
    }

    #[test]
    fn renew_reactivates_cancelled_subscription() {
        let mut sub = Subscription::newsletter("reader@example.com".to_string(), Utc::now());
        sub.cancel(None, Utc::now()).unwrap();

        let end = Utc::now() + chrono::Duration::days(365);
        sub.renew(Some(end), None, Some(Decimal::new(4900, 2)), None, Utc::now());

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.end_date, Some(end));
        assert_eq!(sub.price, Decimal::new(4900, 2));
    }
}
