//! Contact-form submissions and the admin triage workflow over them.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrine_core::{ContactId, DomainError, DomainResult, UserId};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const SUBJECT_MIN: usize = 5;
const SUBJECT_MAX: usize = 200;
const MESSAGE_MIN: usize = 10;
const MESSAGE_MAX: usize = 5000;

/// Submission category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    General,
    Support,
    Sales,
    Technical,
    Billing,
    Feedback,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Support => "support",
            Category::Sales => "sales",
            Category::Technical => "technical",
            Category::Billing => "billing",
            Category::Feedback => "feedback",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Category::General),
            "support" => Ok(Category::Support),
            "sales" => Ok(Category::Sales),
            "technical" => Ok(Category::Technical),
            "billing" => Ok(Category::Billing),
            "feedback" => Ok(Category::Feedback),
            other => Err(DomainError::validation(format!("unknown category '{other}'"))),
        }
    }
}

/// Triage priority.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl core::fmt::Display for Priority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(DomainError::validation(format!("unknown priority '{other}'"))),
        }
    }
}

/// Workflow state of a submission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    New,
    InProgress,
    Resolved,
    Closed,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::InProgress => "in_progress",
            ContactStatus::Resolved => "resolved",
            ContactStatus::Closed => "closed",
        }
    }
}

impl core::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ContactStatus::New),
            "in_progress" => Ok(ContactStatus::InProgress),
            "resolved" => Ok(ContactStatus::Resolved),
            "closed" => Ok(ContactStatus::Closed),
            other => Err(DomainError::validation(format!(
                "unknown contact status '{other}'"
            ))),
        }
    }
}

/// A contact-form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub company: Option<String>,
    pub subject: String,
    pub message: String,
    pub category: Category,
    pub priority: Priority,
    pub status: ContactStatus,
    pub assigned_to: Option<UserId>,
    pub response_message: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Accept a public submission, validating the free-text field lengths.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        name: &str,
        email: &str,
        phone_number: Option<String>,
        company: Option<String>,
        subject: &str,
        message: &str,
        category: Category,
        priority: Option<Priority>,
        ip_address: Option<String>,
        user_agent: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = bounded(name, NAME_MIN, NAME_MAX, "name")?;
        let subject = bounded(subject, SUBJECT_MIN, SUBJECT_MAX, "subject")?;
        let message = bounded(message, MESSAGE_MIN, MESSAGE_MAX, "message")?;

        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        Ok(Self {
            id: ContactId::new(),
            name,
            email,
            phone_number,
            company,
            subject,
            message,
            category,
            priority: priority.unwrap_or_default(),
            status: ContactStatus::New,
            assigned_to: None,
            response_message: None,
            responded_at: None,
            resolved_at: None,
            ip_address,
            user_agent,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move to a new status, stamping `resolved_at` on the first transition
    /// into `Resolved`.
    pub fn set_status(&mut self, status: ContactStatus, now: DateTime<Utc>) {
        if status == ContactStatus::Resolved && self.status != ContactStatus::Resolved {
            self.resolved_at = Some(now);
        }
        self.status = status;
        self.updated_at = now;
    }

    /// Record an admin response; defaults the status to `InProgress`.
    pub fn respond(
        &mut self,
        response_message: String,
        status: Option<ContactStatus>,
        now: DateTime<Utc>,
    ) {
        self.response_message = Some(response_message);
        self.responded_at = Some(now);
        self.set_status(status.unwrap_or(ContactStatus::InProgress), now);
    }

    /// Hand the submission to an admin; fresh submissions start progressing.
    pub fn assign(&mut self, assignee: UserId, now: DateTime<Utc>) {
        self.assigned_to = Some(assignee);
        if self.status == ContactStatus::New {
            self.status = ContactStatus::InProgress;
        }
        self.updated_at = now;
    }
}

fn bounded(value: &str, min: usize, max: usize, field: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.len() < min || value.len() > max {
        return Err(DomainError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(subject: &str, message: &str) -> DomainResult<Contact> {
        Contact::submit(
            "Jane Doe",
            "jane@example.com",
            None,
            None,
            subject,
            message,
            Category::Support,
            None,
            Some("203.0.113.9".to_string()),
            Some("curl/8.0".to_string()),
            Utc::now(),
        )
    }

    #[test]
    fn submission_starts_new_with_medium_priority() {
        let contact = submit("Broken login", "The login page returns a 500.").unwrap();
        assert_eq!(contact.status, ContactStatus::New);
        assert_eq!(contact.priority, Priority::Medium);
        assert_eq!(contact.ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn field_length_bounds_are_enforced() {
        assert!(submit("hey", "long enough message here").is_err());
        assert!(submit("Valid subject", "too short").is_err());
    }

    #[test]
    fn resolving_stamps_resolved_at_once() {
        let mut contact = submit("Broken login", "The login page returns a 500.").unwrap();

        contact.set_status(ContactStatus::Resolved, Utc::now());
        let first = contact.resolved_at.unwrap();

        contact.set_status(ContactStatus::Resolved, Utc::now());
        assert_eq!(contact.resolved_at, Some(first));
    }

    #[test]
    fn respond_defaults_to_in_progress() {
        let mut contact = submit("Broken login", "The login page returns a 500.").unwrap();
        contact.respond("We are on it.".to_string(), None, Utc::now());

        assert_eq!(contact.status, ContactStatus::InProgress);
        assert!(contact.responded_at.is_some());
        assert!(contact.resolved_at.is_none());
    }

    #[test]
    fn respond_with_resolved_stamps_resolution() {
        let mut contact = submit("Broken login", "The login page returns a 500.").unwrap();
        contact.respond("Fixed.".to_string(), Some(ContactStatus::Resolved), Utc::now());

        assert_eq!(contact.status, ContactStatus::Resolved);
        assert!(contact.resolved_at.is_some());
    }

    #[test]
    fn assigning_a_new_contact_starts_progress() {
        let mut contact = submit("Broken login", "The login page returns a 500.").unwrap();
        let admin = UserId::new();
        contact.assign(admin, Utc::now());

        assert_eq!(contact.assigned_to, Some(admin));
        assert_eq!(contact.status, ContactStatus::InProgress);

        contact.set_status(ContactStatus::Resolved, Utc::now());
        contact.assign(UserId::new(), Utc::now());
        assert_eq!(contact.status, ContactStatus::Resolved);
    }
}
