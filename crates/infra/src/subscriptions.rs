//! Subscription repository.

use core::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use vitrine_core::{PageQuery, SortOrder, SubscriptionId, UserId};
use vitrine_subscriptions::{PlanType, Subscription, SubscriptionStatus};

use crate::error::{StoreError, StoreResult};
use crate::users::decode_err;

/// Filters for subscription listings. `user_id` scopes non-admin callers to
/// their own rows.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub user_id: Option<UserId>,
    pub plan_type: Option<PlanType>,
    pub status: Option<SubscriptionStatus>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub page: PageQuery,
}

#[derive(Clone)]
pub struct SubscriptionRepo {
    pool: SqlitePool,
}

impl SubscriptionRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, sub: &Subscription) -> StoreResult<()> {
        let features = serde_json::to_string(&sub.features)
            .map_err(|e| StoreError::decode(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, email, plan_type, status, start_date, end_date,
                renewal_date, price, currency, payment_method, payment_id,
                is_auto_renewal, features, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sub.id.to_string())
        .bind(sub.user_id.map(|id| id.to_string()))
        .bind(&sub.email)
        .bind(sub.plan_type.as_str())
        .bind(sub.status.as_str())
        .bind(sub.start_date)
        .bind(sub.end_date)
        .bind(sub.renewal_date)
        .bind(sub.price.to_string())
        .bind(&sub.currency)
        .bind(&sub.payment_method)
        .bind(&sub.payment_id)
        .bind(sub.is_auto_renewal)
        .bind(features)
        .bind(&sub.notes)
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: SubscriptionId) -> StoreResult<Option<Subscription>> {
        let row = sqlx::query("SELECT * FROM subscriptions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_subscription).transpose()
    }

    /// The row for `id` only if it belongs to `user_id` (owner-scoped reads).
    pub async fn find_by_id_for_user(
        &self,
        id: SubscriptionId,
        user_id: UserId,
    ) -> StoreResult<Option<Subscription>> {
        let row = sqlx::query("SELECT * FROM subscriptions WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_subscription).transpose()
    }

    pub async fn find_active_for_user(&self, user_id: UserId) -> StoreResult<Option<Subscription>> {
        let row = sqlx::query(
            "SELECT * FROM subscriptions WHERE user_id = ? AND status = 'active' LIMIT 1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_subscription).transpose()
    }

    /// An existing active newsletter signup for `email`, if any.
    pub async fn find_active_newsletter(&self, email: &str) -> StoreResult<Option<Subscription>> {
        let row = sqlx::query(
            "SELECT * FROM subscriptions
             WHERE email = ? AND plan_type = 'newsletter' AND status = 'active' LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_subscription).transpose()
    }

    pub async fn save(&self, sub: &Subscription) -> StoreResult<()> {
        let features = serde_json::to_string(&sub.features)
            .map_err(|e| StoreError::decode(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan_type = ?, status = ?, start_date = ?, end_date = ?,
                renewal_date = ?, price = ?, currency = ?, payment_method = ?,
                payment_id = ?, is_auto_renewal = ?, features = ?, notes = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(sub.plan_type.as_str())
        .bind(sub.status.as_str())
        .bind(sub.start_date)
        .bind(sub.end_date)
        .bind(sub.renewal_date)
        .bind(sub.price.to_string())
        .bind(&sub.currency)
        .bind(&sub.payment_method)
        .bind(&sub.payment_id)
        .bind(sub.is_auto_renewal)
        .bind(features)
        .bind(&sub.notes)
        .bind(sub.updated_at)
        .bind(sub.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, id: SubscriptionId) -> StoreResult<()> {
        sqlx::query("DELETE FROM subscriptions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_for_user(&self, user_id: UserId) -> StoreResult<()> {
        sqlx::query("DELETE FROM subscriptions WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list(&self, filter: &SubscriptionFilter) -> StoreResult<(Vec<Subscription>, u64)> {
        let mut count_qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM subscriptions WHERE 1 = 1");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT * FROM subscriptions WHERE 1 = 1");
        push_filters(&mut qb, filter);
        qb.push(format!(
            " ORDER BY {} {} LIMIT ",
            sort_column(filter.sort_by.as_deref()),
            filter.sort_order.as_sql()
        ));
        qb.push_bind(i64::from(filter.page.limit()));
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(filter.page.offset()));

        let rows = qb.build().fetch_all(&self.pool).await?;
        let subs = rows
            .iter()
            .map(row_to_subscription)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((subs, total as u64))
    }

    /// Every subscription of one user, newest first (the unpaginated
    /// "my subscriptions" view).
    pub async fn list_for_user(&self, user_id: UserId) -> StoreResult<Vec<Subscription>> {
        let rows = sqlx::query(
            "SELECT * FROM subscriptions WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_subscription).collect()
    }

    pub async fn count(&self) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    pub async fn count_by_status(&self, status: SubscriptionStatus) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    /// Sum of active subscription prices. Summed in Rust because prices are
    /// stored as decimal strings, which SQLite would add as floats.
    pub async fn revenue_active(&self) -> StoreResult<Decimal> {
        let prices: Vec<String> =
            sqlx::query_scalar("SELECT price FROM subscriptions WHERE status = 'active'")
                .fetch_all(&self.pool)
                .await?;

        let mut total = Decimal::ZERO;
        for price in prices {
            total += Decimal::from_str(&price).map_err(|e| StoreError::decode(e.to_string()))?;
        }
        Ok(total)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &SubscriptionFilter) {
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ");
        qb.push_bind(user_id.to_string());
    }
    if let Some(plan) = filter.plan_type {
        qb.push(" AND plan_type = ");
        qb.push_bind(plan.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status.as_str());
    }
}

fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("start_date") => "start_date",
        Some("end_date") => "end_date",
        Some("price") => "price",
        Some("updated_at") => "updated_at",
        _ => "created_at",
    }
}

fn row_to_subscription(row: &SqliteRow) -> StoreResult<Subscription> {
    let id: String = row.try_get("id")?;
    let user_id: Option<String> = row.try_get("user_id")?;
    let plan_type: String = row.try_get("plan_type")?;
    let status: String = row.try_get("status")?;
    let price: String = row.try_get("price")?;
    let features: String = row.try_get("features")?;

    Ok(Subscription {
        id: id.parse().map_err(decode_err)?,
        user_id: user_id.map(|id| id.parse().map_err(decode_err)).transpose()?,
        email: row.try_get("email")?,
        plan_type: plan_type.parse().map_err(decode_err)?,
        status: status.parse().map_err(decode_err)?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        renewal_date: row.try_get("renewal_date")?,
        price: Decimal::from_str(&price).map_err(|e| StoreError::decode(e.to_string()))?,
        currency: row.try_get("currency")?,
        payment_method: row.try_get("payment_method")?,
        payment_id: row.try_get("payment_id")?,
        is_auto_renewal: row.try_get("is_auto_renewal")?,
        features: serde_json::from_str(&features)
            .map_err(|e| StoreError::decode(e.to_string()))?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::connect_memory;

    async fn repo() -> SubscriptionRepo {
        let pool = connect_memory().await.unwrap();
        SubscriptionRepo::new(pool)
    }

    #[tokio::test]
    async fn newsletter_round_trips_with_decimal_price() {
        let repo = repo().await;
        let sub = Subscription::newsletter("reader@example.com".to_string(), Utc::now());
        repo.insert(&sub).await.unwrap();

        let loaded = repo.find_by_id(sub.id).await.unwrap().unwrap();
        assert_eq!(loaded.plan_type, PlanType::Newsletter);
        assert_eq!(loaded.price, Decimal::ZERO);
        assert_eq!(loaded.email.as_deref(), Some("reader@example.com"));

        let again = repo
            .find_active_newsletter("reader@example.com")
            .await
            .unwrap();
        assert!(again.is_some());
    }

    #[tokio::test]
    async fn active_revenue_sums_only_active_rows() {
        let repo = repo().await;
        let user = UserId::new();

        let paid = Subscription::for_user(
            user,
            PlanType::Premium,
            Decimal::new(4999, 2),
            None,
            None,
            None,
            None,
            None,
            true,
            None,
            None,
            Utc::now(),
        )
        .unwrap();
        repo.insert(&paid).await.unwrap();

        let mut cancelled = Subscription::newsletter("x@example.com".to_string(), Utc::now());
        cancelled.cancel(None, Utc::now()).unwrap();
        repo.insert(&cancelled).await.unwrap();

        assert_eq!(repo.revenue_active().await.unwrap(), Decimal::new(4999, 2));
        assert_eq!(
            repo.count_by_status(SubscriptionStatus::Cancelled).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn owner_scoped_lookup_hides_other_users_rows() {
        let repo = repo().await;
        let owner = UserId::new();
        let stranger = UserId::new();

        let sub = Subscription::for_user(
            owner,
            PlanType::Basic,
            Decimal::ZERO,
            None,
            None,
            None,
            None,
            None,
            true,
            None,
            None,
            Utc::now(),
        )
        .unwrap();
        repo.insert(&sub).await.unwrap();

        assert!(repo.find_by_id_for_user(sub.id, owner).await.unwrap().is_some());
        assert!(repo.find_by_id_for_user(sub.id, stranger).await.unwrap().is_none());
    }
}
