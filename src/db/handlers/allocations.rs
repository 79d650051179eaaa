//! Repository for tool allocations.
//!
//! The one-open-allocation-per-tool rule is enforced by a partial unique
//! index over `tool_id WHERE returned_at IS NULL`, so concurrent checkouts
//! race at the database and the loser surfaces as a unique violation.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::allocations::{
            AllocationCreateDBRequest, AllocationDBResponse, AllocationUpdateDBRequest,
        },
    },
    types::{abbrev_uuid, AccountId, AllocationId, ToolId},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

#[derive(Debug, Clone, Default)]
pub struct AllocationFilter {
    pub account_id: Option<AccountId>,
    pub tool_id: Option<ToolId>,
    pub open_only: bool,
    pub skip: i64,
    pub limit: i64,
}

impl AllocationFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct AllocationRow {
    id: AllocationId,
    tool_id: ToolId,
    account_id: AccountId,
    allocated_at: DateTime<Utc>,
    due_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
}

impl From<AllocationRow> for AllocationDBResponse {
    fn from(row: AllocationRow) -> Self {
        Self {
            id: row.id,
            tool_id: row.tool_id,
            account_id: row.account_id,
            allocated_at: row.allocated_at,
            due_at: row.due_at,
            returned_at: row.returned_at,
        }
    }
}

pub struct Allocations<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Allocations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Close an open allocation. Returns `NotFound` when the allocation does
    /// not exist or was already returned.
    #[instrument(skip(self), fields(allocation_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_returned(&mut self, id: AllocationId) -> Result<AllocationDBResponse> {
        let row = sqlx::query_as::<_, AllocationRow>(
            "UPDATE allocations SET returned_at = NOW()
             WHERE id = $1 AND returned_at IS NULL
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(row.into())
    }
}

#[async_trait::async_trait]
impl Repository for Allocations<'_> {
    type CreateRequest = AllocationCreateDBRequest;
    type UpdateRequest = AllocationUpdateDBRequest;
    type Response = AllocationDBResponse;
    type Id = AllocationId;
    type Filter = AllocationFilter;

    #[instrument(
        skip(self, request),
        fields(tool_id = %abbrev_uuid(&request.tool_id), account_id = %abbrev_uuid(&request.account_id)),
        err
    )]
    async fn create(&mut self, request: &AllocationCreateDBRequest) -> Result<AllocationDBResponse> {
        let row = sqlx::query_as::<_, AllocationRow>(
            "INSERT INTO allocations (tool_id, account_id, due_at)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(request.tool_id)
        .bind(request.account_id)
        .bind(request.due_at)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(row.into())
    }

    #[instrument(skip(self), fields(allocation_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: AllocationId) -> Result<Option<AllocationDBResponse>> {
        let row = sqlx::query_as::<_, AllocationRow>("SELECT * FROM allocations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &AllocationFilter) -> Result<Vec<AllocationDBResponse>> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            "SELECT * FROM allocations
             WHERE ($1::uuid IS NULL OR account_id = $1)
               AND ($2::uuid IS NULL OR tool_id = $2)
               AND (NOT $3 OR returned_at IS NULL)
             ORDER BY allocated_at DESC
             LIMIT $4 OFFSET $5",
        )
        .bind(filter.account_id)
        .bind(filter.tool_id)
        .bind(filter.open_only)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, request), fields(allocation_id = %abbrev_uuid(&id)), err)]
    async fn update(
        &mut self,
        id: AllocationId,
        request: &AllocationUpdateDBRequest,
    ) -> Result<AllocationDBResponse> {
        let row = sqlx::query_as::<_, AllocationRow>(
            "UPDATE allocations SET
               due_at = COALESCE($2, due_at),
               returned_at = COALESCE($3, returned_at)
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(request.due_at)
        .bind(request.returned_at)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(row.into())
    }

    #[instrument(skip(self), fields(allocation_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: AllocationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM allocations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
