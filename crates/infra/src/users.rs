//! User repository.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use vitrine_auth::{Role, User};
use vitrine_core::{PageQuery, SortOrder, UserId};

use crate::error::{StoreError, StoreResult};

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// LIKE match against username, email, first and last name.
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub role: Option<Role>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub page: PageQuery,
}

#[derive(Clone)]
pub struct UserRepo {
    pool: SqlitePool,
}

impl UserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, first_name, last_name,
                phone_number, role, is_active, is_email_verified,
                email_verification_token, last_login_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.is_email_verified)
        .bind(&user.email_verification_token)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    /// Duplicate check for registration and profile updates. `exclude` skips
    /// the user being updated so they can keep their own values.
    pub async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
        exclude: Option<UserId>,
    ) -> StoreResult<Option<User>> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT * FROM users WHERE (email = ");
        qb.push_bind(email.to_string());
        qb.push(" OR username = ");
        qb.push_bind(username.to_string());
        qb.push(")");
        if let Some(exclude) = exclude {
            qb.push(" AND id != ");
            qb.push_bind(exclude.to_string());
        }

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_user).transpose()
    }

    /// Persist every mutable column of an existing row.
    pub async fn save(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                username = ?, email = ?, password_hash = ?, first_name = ?,
                last_name = ?, phone_number = ?, role = ?, is_active = ?,
                is_email_verified = ?, email_verification_token = ?,
                last_login_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.is_email_verified)
        .bind(&user.email_verification_token)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Role change alone, used by admin promotion/demotion.
    pub async fn update_role(&self, id: UserId, role: Role, now: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: UserId) -> StoreResult<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list(&self, filter: &UserFilter) -> StoreResult<(Vec<User>, u64)> {
        let mut count_qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE 1 = 1");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT * FROM users WHERE 1 = 1");
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
        let users = rows.iter().map(row_to_user).collect::<StoreResult<Vec<_>>>()?;
        Ok((users, total as u64))
    }

    pub async fn count(&self) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    pub async fn count_active(&self) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    pub async fn count_created_since(&self, since: DateTime<Utc>) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= ?")
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (username LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR email LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR first_name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR last_name LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ");
        qb.push_bind(is_active);
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ");
        qb.push_bind(role.as_str());
    }
}

/// Whitelist of sortable columns; anything else falls back to `created_at`.
fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("username") => "username",
        Some("email") => "email",
        Some("last_login_at") => "last_login_at",
        Some("updated_at") => "updated_at",
        _ => "created_at",
    }
}

fn row_to_user(row: &SqliteRow) -> StoreResult<User> {
    let id: String = row.try_get("id")?;
    let role: String = row.try_get("role")?;

    Ok(User {
        id: id.parse().map_err(decode_err)?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone_number: row.try_get("phone_number")?,
        role: role.parse().map_err(decode_err)?,
        is_active: row.try_get("is_active")?,
        is_email_verified: row.try_get("is_email_verified")?,
        email_verification_token: row.try_get("email_verification_token")?,
        last_login_at: row.try_get("last_login_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn decode_err(err: vitrine_core::DomainError) -> StoreError {
    StoreError::decode(err.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::connect_memory;

    async fn repo() -> UserRepo {
        let pool = connect_memory().await.unwrap();
        UserRepo::new(pool)
    }

    fn account(username: &str, email: &str) -> User {
        User::register(
            username,
            email,
            "$argon2$fake-hash".to_string(),
            Some("Test".to_string()),
            None,
            None,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn user_round_trips() {
        let repo = repo().await;
        let user = account("alice", "alice@example.com");
        repo.insert(&user).await.unwrap();

        let loaded = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(loaded.id, user.id);
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.role, Role::User);
        assert!(loaded.is_active);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let repo = repo().await;
        repo.insert(&account("alice", "alice@example.com")).await.unwrap();

        let err = repo
            .insert(&account("alice2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation));
    }

    #[tokio::test]
    async fn duplicate_check_can_exclude_self() {
        let repo = repo().await;
        let user = account("alice", "alice@example.com");
        repo.insert(&user).await.unwrap();

        let hit = repo
            .find_by_email_or_username("alice@example.com", "alice", None)
            .await
            .unwrap();
        assert!(hit.is_some());

        let excluded = repo
            .find_by_email_or_username("alice@example.com", "alice", Some(user.id))
            .await
            .unwrap();
        assert!(excluded.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_search_and_role() {
        let repo = repo().await;
        repo.insert(&account("alice", "alice@example.com")).await.unwrap();
        repo.insert(&account("bob", "bob@example.com")).await.unwrap();

        let mut admin = account("carol", "carol@example.com");
        admin.role = Role::Admin;
        repo.insert(&admin).await.unwrap();

        let filter = UserFilter { search: Some("ali".to_string()), ..Default::default() };
        let (users, total) = repo.list(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(users[0].username, "alice");

        let filter = UserFilter { role: Some(Role::Admin), ..Default::default() };
        let (users, total) = repo.list(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(users[0].username, "carol");
    }

    #[tokio::test]
    async fn update_role_persists() {
        let repo = repo().await;
        let user = account("alice", "alice@example.com");
        repo.insert(&user).await.unwrap();

        repo.update_role(user.id, Role::Admin, Utc::now()).await.unwrap();
        let loaded = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::Admin);
    }
}
