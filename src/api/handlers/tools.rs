//! Tool and category management handlers.
//!
//! Anyone authenticated can browse; creating, updating, and deleting is
//! admin-only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::{
    api::models::{
        accounts::CurrentUser,
        tools::{
            CategoryCreate, CategoryResponse, ListToolsQuery, ToolCreate, ToolResponse,
            ToolStatus, ToolUpdate,
        },
    },
    auth::current_user::AdminUser,
    db::{
        errors::DbError,
        handlers::{tools::ToolFilter, Categories, Repository, Tools},
        models::tools::{CategoryCreateDBRequest, ToolCreateDBRequest, ToolUpdateDBRequest},
    },
    errors::Error,
    types::{CategoryId, ToolId},
    AppState,
};

/// List tools, optionally filtered by status or category.
#[utoipa::path(
    get,
    path = "/api/v1/tools",
    tag = "tools",
    params(ListToolsQuery),
    responses((status = 200, description = "Tools", body = Vec<ToolResponse>))
)]
#[instrument(skip_all)]
pub async fn list_tools(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListToolsQuery>,
) -> Result<Json<Vec<ToolResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let tools = Tools::new(&mut conn)
        .list(&ToolFilter {
            status: query.status,
            category_id: query.category_id,
            skip: query.skip,
            limit: query.limit,
        })
        .await?;
    Ok(Json(tools.into_iter().map(Into::into).collect()))
}

/// Add a tool to the inventory.
#[utoipa::path(
    post,
    path = "/api/v1/tools",
    tag = "tools",
    request_body = ToolCreate,
    responses(
        (status = 201, description = "Created tool", body = ToolResponse),
        (status = 403, description = "Admin role required"),
    )
)]
#[instrument(skip_all, fields(name = %request.name))]
pub async fn create_tool(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<ToolCreate>,
) -> Result<(StatusCode, Json<ToolResponse>), Error> {
    if request.name.trim().is_empty() {
        return Err(Error::Validation {
            field: "name",
            message: "Name is required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let tool = Tools::new(&mut conn)
        .create(&ToolCreateDBRequest {
            name: request.name.trim().to_string(),
            description: request.description,
            category_id: request.category_id,
            status: request.status.unwrap_or(ToolStatus::Available),
            added_by: Some(admin.id),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(tool.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/tools/{id}",
    tag = "tools",
    params(("id" = String, Path, format = "uuid")),
    responses(
        (status = 200, description = "Tool", body = ToolResponse),
        (status = 404, description = "No such tool"),
    )
)]
#[instrument(skip_all, fields(tool_id = %id))]
pub async fn get_tool(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<ToolId>,
) -> Result<Json<ToolResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let tool = Tools::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Tool".to_string(),
            id: id.to_string(),
        })?;
    Ok(Json(tool.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/tools/{id}",
    tag = "tools",
    params(("id" = String, Path, format = "uuid")),
    request_body = ToolUpdate,
    responses(
        (status = 200, description = "Updated tool", body = ToolResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such tool"),
    )
)]
#[instrument(skip_all, fields(tool_id = %id))]
pub async fn update_tool(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<ToolId>,
    Json(request): Json<ToolUpdate>,
) -> Result<Json<ToolResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let tool = Tools::new(&mut conn)
        .update(
            id,
            &ToolUpdateDBRequest {
                name: request.name,
                description: request.description,
                category_id: request.category_id,
                status: request.status,
            },
        )
        .await
        .map_err(|e| match e {
            DbError::NotFound => Error::NotFound {
                resource: "Tool".to_string(),
                id: id.to_string(),
            },
            other => other.into(),
        })?;
    Ok(Json(tool.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tools/{id}",
    tag = "tools",
    params(("id" = String, Path, format = "uuid")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such tool"),
    )
)]
#[instrument(skip_all, fields(tool_id = %id))]
pub async fn delete_tool(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<ToolId>,
) -> Result<StatusCode, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let deleted = Tools::new(&mut conn).delete(id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Tool".to_string(),
            id: id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}

/// List categories.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "categories",
    responses((status = 200, description = "Categories", body = Vec<CategoryResponse>))
)]
#[instrument(skip_all)]
pub async fn list_categories(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<CategoryResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let categories = Categories::new(&mut conn).list().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// Create a category.
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "categories",
    request_body = CategoryCreate,
    responses(
        (status = 201, description = "Created category", body = CategoryResponse),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Name already taken"),
    )
)]
#[instrument(skip_all, fields(name = %request.name))]
pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryResponse>), Error> {
    if request.name.trim().is_empty() {
        return Err(Error::Validation {
            field: "name",
            message: "Name is required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let category = Categories::new(&mut conn)
        .create(&CategoryCreateDBRequest {
            name: request.name.trim().to_string(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Delete a category. Tools in it are detached, not deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    tag = "categories",
    params(("id" = String, Path, format = "uuid")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such category"),
    )
)]
#[instrument(skip_all, fields(category_id = %id))]
pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let deleted = Categories::new(&mut conn).delete(id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Category".to_string(),
            id: id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
