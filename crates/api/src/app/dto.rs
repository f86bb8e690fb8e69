//! Request/response DTOs and JSON mapping helpers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use vitrine_auth::{AccessLevel, AdminProfile, PermissionGrid, Role, User};
use vitrine_contacts::{Category, Contact, ContactStatus, Priority};
use vitrine_core::{Pagination, SortOrder};
use vitrine_subscriptions::{PlanType, Subscription, SubscriptionStatus};

// -------------------------
// Auth requests
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// -------------------------
// Subscription requests
// -------------------------

#[derive(Debug, Deserialize)]
pub struct NewsletterRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan_type: PlanType,
    pub price: Decimal,
    pub currency: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_auto_renewal: bool,
    pub features: Option<serde_json::Value>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub plan_type: Option<PlanType>,
    pub status: Option<SubscriptionStatus>,
    pub end_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub is_auto_renewal: Option<bool>,
    pub features: Option<serde_json::Value>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenewSubscriptionRequest {
    pub end_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
    pub price: Option<Decimal>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub plan_type: Option<PlanType>,
    pub status: Option<SubscriptionStatus>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

// -------------------------
// Contact requests
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub company: Option<String>,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub category: Category,
    pub priority: Option<Priority>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactRequest {
    pub status: Option<ContactStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    pub response_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondToContactRequest {
    pub response_message: String,
    pub status: Option<ContactStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AssignContactRequest {
    pub assigned_to: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<Category>,
    pub status: Option<ContactStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

// -------------------------
// Admin requests
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub user_id: String,
    pub permissions: Option<PermissionGrid>,
    pub department: Option<String>,
    pub position: Option<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminRequest {
    pub permissions: Option<PermissionGrid>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub access_level: Option<AccessLevel>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub permissions: PermissionGrid,
}

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub access_level: Option<AccessLevel>,
    pub is_active: Option<bool>,
    pub department: Option<String>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Deserialize)]
pub struct AdminUserUpdateRequest {
    pub is_active: Option<bool>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub role: Option<Role>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Deserialize)]
pub struct AssignedContactsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ContactStatus>,
    pub priority: Option<Priority>,
}

fn default_true() -> bool {
    true
}

// -------------------------
// JSON mapping
// -------------------------

/// Public view of an account: everything except credentials/tokens.
pub fn user_to_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "phone_number": user.phone_number,
        "role": user.role,
        "is_active": user.is_active,
        "is_email_verified": user.is_email_verified,
        "last_login_at": user.last_login_at,
        "created_at": user.created_at,
        "updated_at": user.updated_at,
    })
}

/// Short form embedded in admin/contact payloads.
pub fn user_summary_to_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "first_name": user.first_name,
        "last_name": user.last_name,
    })
}

pub fn subscription_to_json(sub: &Subscription) -> serde_json::Value {
    json!({
        "id": sub.id,
        "user_id": sub.user_id,
        "email": sub.email,
        "plan_type": sub.plan_type,
        "status": sub.status,
        "start_date": sub.start_date,
        "end_date": sub.end_date,
        "renewal_date": sub.renewal_date,
        "price": sub.price,
        "currency": sub.currency,
        "payment_method": sub.payment_method,
        "payment_id": sub.payment_id,
        "is_auto_renewal": sub.is_auto_renewal,
        "features": sub.features,
        "notes": sub.notes,
        "created_at": sub.created_at,
        "updated_at": sub.updated_at,
    })
}

pub fn contact_to_json(contact: &Contact) -> serde_json::Value {
    json!({
        "id": contact.id,
        "name": contact.name,
        "email": contact.email,
        "phone_number": contact.phone_number,
        "company": contact.company,
        "subject": contact.subject,
        "message": contact.message,
        "category": contact.category,
        "priority": contact.priority,
        "status": contact.status,
        "assigned_to": contact.assigned_to,
        "response_message": contact.response_message,
        "responded_at": contact.responded_at,
        "resolved_at": contact.resolved_at,
        "created_at": contact.created_at,
        "updated_at": contact.updated_at,
    })
}

/// Admin profile, optionally with the owning user's summary attached.
pub fn admin_to_json(profile: &AdminProfile, user: Option<&User>) -> serde_json::Value {
    json!({
        "id": profile.id,
        "user_id": profile.user_id,
        "access_level": profile.access_level,
        "permissions": profile.permissions,
        "department": profile.department,
        "position": profile.position,
        "is_active": profile.is_active,
        "last_access_at": profile.last_access_at,
        "created_by": profile.created_by,
        "notes": profile.notes,
        "created_at": profile.created_at,
        "updated_at": profile.updated_at,
        "user": user.map(user_summary_to_json),
    })
}

pub fn pagination_to_json(pagination: &Pagination) -> serde_json::Value {
    json!({
        "page": pagination.page,
        "limit": pagination.limit,
        "total": pagination.total,
        "total_pages": pagination.total_pages,
    })
}
