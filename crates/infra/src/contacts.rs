//! Contact repository.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use vitrine_contacts::{Category, Contact, ContactStatus, Priority};
use vitrine_core::{ContactId, PageQuery, SortOrder, UserId};

use crate::error::StoreResult;
use crate::users::decode_err;

/// Filters for the admin contact listing.
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub category: Option<Category>,
    pub status: Option<ContactStatus>,
    pub priority: Option<Priority>,
    /// LIKE match against name, email, subject and company.
    pub search: Option<String>,
    pub assigned_to: Option<UserId>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub page: PageQuery,
}

#[derive(Clone)]
pub struct ContactRepo {
    pool: SqlitePool,
}

impl ContactRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, contact: &Contact) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contacts (
                id, name, email, phone_number, company, subject, message,
                category, priority, status, assigned_to, response_message,
                responded_at, resolved_at, ip_address, user_agent,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(contact.id.to_string())
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone_number)
        .bind(&contact.company)
        .bind(&contact.subject)
        .bind(&contact.message)
        .bind(contact.category.as_str())
        .bind(contact.priority.as_str())
        .bind(contact.status.as_str())
        .bind(contact.assigned_to.map(|id| id.to_string()))
        .bind(&contact.response_message)
        .bind(contact.responded_at)
        .bind(contact.resolved_at)
        .bind(&contact.ip_address)
        .bind(&contact.user_agent)
        .bind(contact.created_at)
        .bind(contact.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: ContactId) -> StoreResult<Option<Contact>> {
        let row = sqlx::query("SELECT * FROM contacts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_contact).transpose()
    }

    pub async fn save(&self, contact: &Contact) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE contacts SET
                category = ?, priority = ?, status = ?, assigned_to = ?,
                response_message = ?, responded_at = ?, resolved_at = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(contact.category.as_str())
        .bind(contact.priority.as_str())
        .bind(contact.status.as_str())
        .bind(contact.assigned_to.map(|id| id.to_string()))
        .bind(&contact.response_message)
        .bind(contact.responded_at)
        .bind(contact.resolved_at)
        .bind(contact.updated_at)
        .bind(contact.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, id: ContactId) -> StoreResult<()> {
        sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Clear assignments pointing at a user being deleted.
    pub async fn unassign_user(&self, user_id: UserId) -> StoreResult<()> {
        sqlx::query("UPDATE contacts SET assigned_to = NULL WHERE assigned_to = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list(&self, filter: &ContactFilter) -> StoreResult<(Vec<Contact>, u64)> {
        let mut count_qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM contacts WHERE 1 = 1");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT * FROM contacts WHERE 1 = 1");
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
        let contacts = rows.iter().map(row_to_contact).collect::<StoreResult<Vec<_>>>()?;
        Ok((contacts, total as u64))
    }

    pub async fn count(&self) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    pub async fn count_by_status(&self, status: ContactStatus) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ContactFilter) {
    if let Some(category) = filter.category {
        qb.push(" AND category = ");
        qb.push_bind(category.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ");
        qb.push_bind(priority.as_str());
    }
    if let Some(assigned_to) = filter.assigned_to {
        qb.push(" AND assigned_to = ");
        qb.push_bind(assigned_to.to_string());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR email LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR subject LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR company LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}

fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("priority") => "priority",
        Some("status") => "status",
        Some("responded_at") => "responded_at",
        Some("updated_at") => "updated_at",
        _ => "created_at",
    }
}

fn row_to_contact(row: &SqliteRow) -> StoreResult<Contact> {
    let id: String = row.try_get("id")?;
    let category: String = row.try_get("category")?;
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    let assigned_to: Option<String> = row.try_get("assigned_to")?;

    Ok(Contact {
        id: id.parse().map_err(decode_err)?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        company: row.try_get("company")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        category: category.parse().map_err(decode_err)?,
        priority: priority.parse().map_err(decode_err)?,
        status: status.parse().map_err(decode_err)?,
        assigned_to: assigned_to
            .map(|id| id.parse().map_err(decode_err))
            .transpose()?,
        response_message: row.try_get("response_message")?,
        responded_at: row.try_get("responded_at")?,
        resolved_at: row.try_get("resolved_at")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::connect_memory;

    async fn repo() -> ContactRepo {
        let pool = connect_memory().await.unwrap();
        ContactRepo::new(pool)
    }

    fn sample(subject: &str) -> Contact {
        Contact::submit(
            "Jane Doe",
            "jane@example.com",
            None,
            Some("Acme".to_string()),
            subject,
            "Something broke and this describes it.",
            Category::Support,
            Some(Priority::High),
            None,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn contact_round_trips() {
        let repo = repo().await;
        let contact = sample("Login broken");
        repo.insert(&contact).await.unwrap();

        let loaded = repo.find_by_id(contact.id).await.unwrap().unwrap();
        assert_eq!(loaded.subject, "Login broken");
        assert_eq!(loaded.priority, Priority::High);
        assert_eq!(loaded.status, ContactStatus::New);
    }

    #[tokio::test]
    async fn search_filter_matches_subject() {
        let repo = repo().await;
        repo.insert(&sample("Billing question about invoices")).await.unwrap();
        repo.insert(&sample("Totally unrelated topic")).await.unwrap();

        let filter = ContactFilter {
            search: Some("invoices".to_string()),
            ..Default::default()
        };
        let (items, total) = repo.list(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].subject, "Billing question about invoices");
    }

    #[tokio::test]
    async fn unassign_user_clears_assignments() {
        let repo = repo().await;
        let admin = UserId::new();

        let mut contact = sample("Needs an owner");
        contact.assign(admin, Utc::now());
        repo.insert(&contact).await.unwrap();

        repo.unassign_user(admin).await.unwrap();
        let loaded = repo.find_by_id(contact.id).await.unwrap().unwrap();
        assert!(loaded.assigned_to.is_none());
        // Assignment state survives; only the owner reference is cleared.
        assert_eq!(loaded.status, ContactStatus::InProgress);
    }
}
