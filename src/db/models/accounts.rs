//! Database models for accounts.

use crate::api::models::accounts::{AccountStatus, Provider, Role};
use crate::types::AccountId;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: Option<Provider>,
    pub provider_id: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub email_verified_at: Option<DateTime<Utc>>,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdateDBRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub password_hash: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct AccountDBResponse {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: Option<Provider>,
    pub provider_id: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub status: AccountStatus,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
