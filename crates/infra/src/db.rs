//! Pool construction and schema migration.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::StoreResult;

/// Connect to the SQLite database at `url` and ensure the schema exists.
///
/// File URLs should carry `mode=rwc` so the file is created on first start.
/// For an in-memory database use [`connect_memory`] instead.
pub async fn connect(url: &str) -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.foreign_keys(false);
    let pool = SqlitePool::connect_with(options).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// In-memory database (tests). A single pooled connection that is never
/// reaped, since every `:memory:` connection is its own database.
pub async fn connect_memory() -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(false);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<std::time::Duration>)
        .max_lifetime(None::<std::time::Duration>)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Create tables and indexes if they do not exist yet.
///
/// The unique index on `admin_profiles.user_id` is load-bearing: it is the
/// single source of truth for the one-profile-per-user invariant that the
/// authorization gate's auto-provisioning relies on.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id                        TEXT PRIMARY KEY,
            username                  TEXT NOT NULL UNIQUE,
            email                     TEXT NOT NULL UNIQUE,
            password_hash             TEXT NOT NULL,
            first_name                TEXT NULL,
            last_name                 TEXT NULL,
            phone_number              TEXT NULL,
            role                      TEXT NOT NULL DEFAULT 'user',
            is_active                 INTEGER NOT NULL DEFAULT 1,
            is_email_verified         INTEGER NOT NULL DEFAULT 0,
            email_verification_token  TEXT NULL,
            last_login_at             TEXT NULL,
            created_at                TEXT NOT NULL,
            updated_at                TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_profiles (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL UNIQUE REFERENCES users(id),
            access_level    TEXT NOT NULL DEFAULT 'read_only',
            permissions     TEXT NOT NULL,
            department      TEXT NULL,
            position        TEXT NULL,
            is_active       INTEGER NOT NULL DEFAULT 1,
            last_access_at  TEXT NULL,
            created_by      TEXT NULL,
            notes           TEXT NULL,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NULL REFERENCES users(id),
            email            TEXT NULL,
            plan_type        TEXT NOT NULL DEFAULT 'basic',
            status           TEXT NOT NULL DEFAULT 'active',
            start_date       TEXT NOT NULL,
            end_date         TEXT NULL,
            renewal_date     TEXT NULL,
            price            TEXT NOT NULL DEFAULT '0.00',
            currency         TEXT NOT NULL DEFAULT 'USD',
            payment_method   TEXT NULL,
            payment_id       TEXT NULL,
            is_auto_renewal  INTEGER NOT NULL DEFAULT 1,
            features         TEXT NOT NULL DEFAULT '{}',
            notes            TEXT NULL,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id                TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            email             TEXT NOT NULL,
            phone_number      TEXT NULL,
            company           TEXT NULL,
            subject           TEXT NOT NULL,
            message           TEXT NOT NULL,
            category          TEXT NOT NULL DEFAULT 'general',
            priority          TEXT NOT NULL DEFAULT 'medium',
            status            TEXT NOT NULL DEFAULT 'new',
            assigned_to       TEXT NULL REFERENCES users(id),
            response_message  TEXT NULL,
            responded_at      TEXT NULL,
            resolved_at       TEXT NULL,
            ip_address        TEXT NULL,
            user_agent        TEXT NULL,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_assigned ON contacts(assigned_to)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_status ON contacts(status)")
        .execute(pool)
        .await?;

    Ok(())
}
