//! Repository for account records.
//!
//! Besides the standard CRUD surface, accounts have two lookups the
//! registration and login flows need: case-insensitive fetch by email, and an
//! idempotent "mark verified" update.

use crate::{
    api::models::accounts::{AccountStatus, Provider, Role},
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::accounts::{AccountCreateDBRequest, AccountDBResponse, AccountUpdateDBRequest},
    },
    types::{abbrev_uuid, AccountId},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct AccountFilter {
    pub skip: i64,
    pub limit: i64,
}

impl AccountFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

impl Default for AccountFilter {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct AccountRow {
    id: AccountId,
    name: String,
    email: String,
    password_hash: Option<String>,
    provider: Option<Provider>,
    provider_id: Option<String>,
    email_verified_at: Option<DateTime<Utc>>,
    status: AccountStatus,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for AccountDBResponse {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            provider: row.provider,
            provider_id: row.provider_id,
            email_verified_at: row.email_verified_at,
            status: row.status,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct Accounts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Case-insensitive lookup by email address.
    #[instrument(skip(self), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<AccountDBResponse>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Mark the account's email as verified. A no-op when it already is:
    /// neither the verification timestamp nor `updated_at` moves.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_email_verified(&mut self, id: AccountId) -> Result<AccountDBResponse> {
        let row = sqlx::query_as::<_, AccountRow>(
            "UPDATE accounts
             SET email_verified_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND email_verified_at IS NULL
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;
        match row {
            Some(row) => Ok(row.into()),
            // Already verified, or no such account.
            None => self.get_by_id(id).await?.ok_or(DbError::NotFound),
        }
    }
}

#[async_trait::async_trait]
impl Repository for Accounts<'_> {
    type CreateRequest = AccountCreateDBRequest;
    type UpdateRequest = AccountUpdateDBRequest;
    type Response = AccountDBResponse;
    type Id = AccountId;
    type Filter = AccountFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &AccountCreateDBRequest) -> Result<AccountDBResponse> {
        let row = sqlx::query_as::<_, AccountRow>(
            "INSERT INTO accounts
               (name, email, password_hash, provider, provider_id, role, status, email_verified_at)
             VALUES ($1, lower($2), $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.provider)
        .bind(&request.provider_id)
        .bind(request.role)
        .bind(request.status)
        .bind(request.email_verified_at)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(row.into())
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: AccountId) -> Result<Option<AccountDBResponse>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &AccountFilter) -> Result<Vec<AccountDBResponse>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn update(
        &mut self,
        id: AccountId,
        request: &AccountUpdateDBRequest,
    ) -> Result<AccountDBResponse> {
        let row = sqlx::query_as::<_, AccountRow>(
            "UPDATE accounts SET
               name = COALESCE($2, name),
               role = COALESCE($3, role),
               status = COALESCE($4, status),
               password_hash = COALESCE($5, password_hash),
               email_verified_at = COALESCE($6, email_verified_at),
               updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&request.name)
        .bind(request.role)
        .bind(request.status)
        .bind(&request.password_hash)
        .bind(request.email_verified_at)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(row.into())
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: AccountId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
