//! Admin profile repository.
//!
//! The unique index on `user_id` backs the one-profile-per-user invariant;
//! `create_or_reuse` is the storage half of the gate's auto-provisioning.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use vitrine_auth::{AccessLevel, AdminProfile};
use vitrine_core::{AdminProfileId, PageQuery, SortOrder, UserId};

use crate::error::{StoreError, StoreResult};
use crate::users::decode_err;

/// Filters for the admin-profile listing.
#[derive(Debug, Clone, Default)]
pub struct AdminProfileFilter {
    pub access_level: Option<AccessLevel>,
    pub is_active: Option<bool>,
    pub department: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub page: PageQuery,
}

#[derive(Clone)]
pub struct AdminProfileRepo {
    pool: SqlitePool,
}

impl AdminProfileRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, profile: &AdminProfile) -> StoreResult<()> {
        let permissions = serde_json::to_string(&profile.permissions)
            .map_err(|e| StoreError::decode(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO admin_profiles (
                id, user_id, access_level, permissions, department, position,
                is_active, last_access_at, created_by, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(profile.id.to_string())
        .bind(profile.user_id.to_string())
        .bind(profile.access_level.as_str())
        .bind(permissions)
        .bind(&profile.department)
        .bind(&profile.position)
        .bind(profile.is_active)
        .bind(profile.last_access_at)
        .bind(profile.created_by.map(|id| id.to_string()))
        .bind(&profile.notes)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert `profile`, or, when a concurrent first access won the race,
    /// fall back to the row that beat us. The unique index is the arbiter;
    /// losing it is not an error.
    pub async fn create_or_reuse(&self, profile: AdminProfile) -> StoreResult<AdminProfile> {
        match self.insert(&profile).await {
            Ok(()) => Ok(profile),
            Err(StoreError::UniqueViolation) => self
                .find_by_user_id(profile.user_id)
                .await?
                .ok_or(StoreError::UniqueViolation),
            Err(other) => Err(other),
        }
    }

    pub async fn find_by_id(&self, id: AdminProfileId) -> StoreResult<Option<AdminProfile>> {
        let row = sqlx::query("SELECT * FROM admin_profiles WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_profile).transpose()
    }

    pub async fn find_by_user_id(&self, user_id: UserId) -> StoreResult<Option<AdminProfile>> {
        let row = sqlx::query("SELECT * FROM admin_profiles WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_profile).transpose()
    }

    pub async fn save(&self, profile: &AdminProfile) -> StoreResult<()> {
        let permissions = serde_json::to_string(&profile.permissions)
            .map_err(|e| StoreError::decode(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE admin_profiles SET
                access_level = ?, permissions = ?, department = ?, position = ?,
                is_active = ?, last_access_at = ?, notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(profile.access_level.as_str())
        .bind(permissions)
        .bind(&profile.department)
        .bind(&profile.position)
        .bind(profile.is_active)
        .bind(profile.last_access_at)
        .bind(&profile.notes)
        .bind(profile.updated_at)
        .bind(profile.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, id: AdminProfileId) -> StoreResult<()> {
        sqlx::query("DELETE FROM admin_profiles WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_by_user_id(&self, user_id: UserId) -> StoreResult<()> {
        sqlx::query("DELETE FROM admin_profiles WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list(&self, filter: &AdminProfileFilter) -> StoreResult<(Vec<AdminProfile>, u64)> {
        let mut count_qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM admin_profiles WHERE 1 = 1");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT * FROM admin_profiles WHERE 1 = 1");
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
        let profiles = rows.iter().map(row_to_profile).collect::<StoreResult<Vec<_>>>()?;
        Ok((profiles, total as u64))
    }

    pub async fn count(&self) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_profiles")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    pub async fn count_active(&self) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_profiles WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AdminProfileFilter) {
    if let Some(level) = filter.access_level {
        qb.push(" AND access_level = ");
        qb.push_bind(level.as_str());
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ");
        qb.push_bind(is_active);
    }
    if let Some(department) = &filter.department {
        qb.push(" AND department = ");
        qb.push_bind(department.clone());
    }
}

fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("access_level") => "access_level",
        Some("last_access_at") => "last_access_at",
        Some("updated_at") => "updated_at",
        _ => "created_at",
    }
}

fn row_to_profile(row: &SqliteRow) -> StoreResult<AdminProfile> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let access_level: String = row.try_get("access_level")?;
    let permissions: String = row.try_get("permissions")?;
    let created_by: Option<String> = row.try_get("created_by")?;

    Ok(AdminProfile {
        id: id.parse().map_err(decode_err)?,
        user_id: user_id.parse().map_err(decode_err)?,
        access_level: access_level.parse().map_err(decode_err)?,
        permissions: serde_json::from_str(&permissions)
            .map_err(|e| StoreError::decode(e.to_string()))?,
        department: row.try_get("department")?,
        position: row.try_get("position")?,
        is_active: row.try_get("is_active")?,
        last_access_at: row.try_get("last_access_at")?,
        created_by: created_by
            .map(|id| id.parse().map_err(decode_err))
            .transpose()?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use vitrine_auth::PermissionGrid;

    use super::*;
    use crate::db::connect_memory;

    async fn repo() -> AdminProfileRepo {
        let pool = connect_memory().await.unwrap();
        AdminProfileRepo::new(pool)
    }

    #[tokio::test]
    async fn profile_round_trips() {
        let repo = repo().await;
        let profile = AdminProfile::provisioned(UserId::new(), Utc::now());
        repo.insert(&profile).await.unwrap();

        let loaded = repo.find_by_user_id(profile.user_id).await.unwrap().unwrap();
        assert_eq!(loaded.id, profile.id);
        assert_eq!(loaded.access_level, profile.access_level);
        assert_eq!(loaded.permissions, PermissionGrid::default_grid());
        assert_eq!(loaded.department.as_deref(), Some("IT"));
    }

    #[tokio::test]
    async fn second_insert_for_same_user_is_a_unique_violation() {
        let repo = repo().await;
        let user_id = UserId::new();
        repo.insert(&AdminProfile::provisioned(user_id, Utc::now()))
            .await
            .unwrap();

        let err = repo
            .insert(&AdminProfile::provisioned(user_id, Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation));
    }

    #[tokio::test]
    async fn losing_the_provisioning_race_reuses_the_existing_row() {
        let repo = repo().await;
        let user_id = UserId::new();

        let winner = repo
            .create_or_reuse(AdminProfile::provisioned(user_id, Utc::now()))
            .await
            .unwrap();
        let loser = repo
            .create_or_reuse(AdminProfile::provisioned(user_id, Utc::now()))
            .await
            .unwrap();

        // The loser got the winner's row back, and only one row exists.
        assert_eq!(loser.id, winner.id);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_by_user_id_removes_the_profile() {
        let repo = repo().await;
        let user_id = UserId::new();
        repo.insert(&AdminProfile::provisioned(user_id, Utc::now()))
            .await
            .unwrap();

        repo.delete_by_user_id(user_id).await.unwrap();
        assert!(repo.find_by_user_id(user_id).await.unwrap().is_none());
    }
}
