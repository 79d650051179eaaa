//! Repositories for tools and categories.

use crate::{
    api::models::tools::ToolStatus,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::tools::{
            CategoryCreateDBRequest, CategoryDBResponse, ToolCreateDBRequest, ToolDBResponse,
            ToolUpdateDBRequest,
        },
    },
    types::{abbrev_uuid, CategoryId, ToolId},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

#[derive(Debug, Clone, Default)]
pub struct ToolFilter {
    pub status: Option<ToolStatus>,
    pub category_id: Option<CategoryId>,
    pub skip: i64,
    pub limit: i64,
}

impl ToolFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            status: None,
            category_id: None,
            skip,
            limit,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct ToolRow {
    id: ToolId,
    name: String,
    description: Option<String>,
    category_id: Option<CategoryId>,
    status: ToolStatus,
    added_by: Option<crate::types::AccountId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ToolRow> for ToolDBResponse {
    fn from(row: ToolRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            status: row.status,
            added_by: row.added_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct Tools<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Tools<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Repository for Tools<'_> {
    type CreateRequest = ToolCreateDBRequest;
    type UpdateRequest = ToolUpdateDBRequest;
    type Response = ToolDBResponse;
    type Id = ToolId;
    type Filter = ToolFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &ToolCreateDBRequest) -> Result<ToolDBResponse> {
        let row = sqlx::query_as::<_, ToolRow>(
            "INSERT INTO tools (name, description, category_id, status, added_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.category_id)
        .bind(request.status)
        .bind(request.added_by)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(row.into())
    }

    #[instrument(skip(self), fields(tool_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: ToolId) -> Result<Option<ToolDBResponse>> {
        let row = sqlx::query_as::<_, ToolRow>("SELECT * FROM tools WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &ToolFilter) -> Result<Vec<ToolDBResponse>> {
        let rows = sqlx::query_as::<_, ToolRow>(
            "SELECT * FROM tools
             WHERE ($1::tool_status IS NULL OR status = $1)
               AND ($2::uuid IS NULL OR category_id = $2)
             ORDER BY name
             LIMIT $3 OFFSET $4",
        )
        .bind(filter.status)
        .bind(filter.category_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, request), fields(tool_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: ToolId, request: &ToolUpdateDBRequest) -> Result<ToolDBResponse> {
        let row = sqlx::query_as::<_, ToolRow>(
            "UPDATE tools SET
               name = COALESCE($2, name),
               description = COALESCE($3, description),
               category_id = COALESCE($4, category_id),
               status = COALESCE($5, status),
               updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.category_id)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(row.into())
    }

    #[instrument(skip(self), fields(tool_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: ToolId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tools WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for CategoryDBResponse {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Categories are a flat lookup table; they get a small bespoke surface
/// instead of the full repository trait.
pub struct Categories<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Categories<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    pub async fn create(&mut self, request: &CategoryCreateDBRequest) -> Result<CategoryDBResponse> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING *",
        )
        .bind(&request.name)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(row.into())
    }

    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<CategoryDBResponse>> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&mut *self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: CategoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn create_request(name: &str) -> ToolCreateDBRequest {
        ToolCreateDBRequest {
            name: name.to_string(),
            description: Some("A tool".to_string()),
            category_id: None,
            status: ToolStatus::Available,
            added_by: None,
        }
    }

    #[sqlx::test]
    async fn test_create_list_filter_by_status(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut tools = Tools::new(&mut conn);

        tools.create(&create_request("Drill")).await.unwrap();
        let saw = tools.create(&create_request("Saw")).await.unwrap();
        tools
            .update(
                saw.id,
                &ToolUpdateDBRequest {
                    status: Some(ToolStatus::Maintenance),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let all = tools.list(&ToolFilter::new(0, 100)).await.unwrap();
        assert_eq!(all.len(), 2);

        let available = tools
            .list(&ToolFilter {
                status: Some(ToolStatus::Available),
                ..ToolFilter::new(0, 100)
            })
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name, "Drill");
    }

    #[sqlx::test]
    async fn test_deleting_category_detaches_tools(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();

        let category = Categories::new(&mut conn)
            .create(&CategoryCreateDBRequest {
                name: "Woodworking".to_string(),
            })
            .await
            .unwrap();

        let mut tools = Tools::new(&mut conn);
        let tool = tools
            .create(&ToolCreateDBRequest {
                category_id: Some(category.id),
                ..create_request("Chisel")
            })
            .await
            .unwrap();
        assert_eq!(tool.category_id, Some(category.id));

        assert!(Categories::new(&mut conn).delete(category.id).await.unwrap());

        let tool = Tools::new(&mut conn)
            .get_by_id(tool.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tool.category_id, None);
    }

    #[sqlx::test]
    async fn test_duplicate_category_name(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut categories = Categories::new(&mut conn);

        categories
            .create(&CategoryCreateDBRequest {
                name: "Electrical".to_string(),
            })
            .await
            .unwrap();
        let err = categories
            .create(&CategoryCreateDBRequest {
                name: "Electrical".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
