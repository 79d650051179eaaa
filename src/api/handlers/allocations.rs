//! Allocation (checkout and return) handlers.
//!
//! Checkout runs in a transaction: the tool must exist and be available, and
//! the partial unique index over open allocations settles any race between
//! concurrent checkouts of the same tool.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::{
    api::models::{
        accounts::CurrentUser,
        allocations::{AllocationCreate, AllocationResponse, ListAllocationsQuery},
        tools::ToolStatus,
    },
    db::{
        errors::DbError,
        handlers::{allocations::AllocationFilter, Allocations, Repository, Tools},
        models::allocations::AllocationCreateDBRequest,
    },
    errors::Error,
    types::{AllocationId, ToolId},
    AppState,
};

/// Check a tool out.
#[utoipa::path(
    post,
    path = "/api/v1/tools/{id}/allocations",
    tag = "allocations",
    params(("id" = String, Path, format = "uuid")),
    request_body = AllocationCreate,
    responses(
        (status = 201, description = "Tool checked out", body = AllocationResponse),
        (status = 400, description = "Tool is not available"),
        (status = 404, description = "No such tool"),
        (status = 409, description = "Tool is already checked out"),
    )
)]
#[instrument(skip_all, fields(tool_id = %tool_id))]
pub async fn checkout_tool(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tool_id): Path<ToolId>,
    Json(request): Json<AllocationCreate>,
) -> Result<(StatusCode, Json<AllocationResponse>), Error> {
    let account_id = match request.account_id {
        Some(other) if other != user.id => {
            if !user.is_admin() {
                return Err(Error::Forbidden {
                    message: "Only administrators can check tools out for other accounts"
                        .to_string(),
                });
            }
            other
        }
        _ => user.id,
    };

    let mut tx = state.db.begin().await.map_err(DbError::from)?;

    let tool = Tools::new(&mut tx)
        .get_by_id(tool_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Tool".to_string(),
            id: tool_id.to_string(),
        })?;
    if tool.status != ToolStatus::Available {
        return Err(Error::BadRequest {
            message: "This tool is not available for checkout".to_string(),
        });
    }

    let allocation = Allocations::new(&mut tx)
        .create(&AllocationCreateDBRequest {
            tool_id,
            account_id,
            due_at: request.due_at,
        })
        .await?;
    tx.commit().await.map_err(DbError::from)?;

    Ok((StatusCode::CREATED, Json(allocation.into())))
}

/// Return a checked-out tool.
#[utoipa::path(
    post,
    path = "/api/v1/allocations/{id}/return",
    tag = "allocations",
    params(("id" = String, Path, format = "uuid")),
    responses(
        (status = 200, description = "Tool returned", body = AllocationResponse),
        (status = 400, description = "Already returned"),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "No such allocation"),
    )
)]
#[instrument(skip_all, fields(allocation_id = %id))]
pub async fn return_tool(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AllocationId>,
) -> Result<Json<AllocationResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut allocations = Allocations::new(&mut conn);

    let allocation = allocations
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Allocation".to_string(),
            id: id.to_string(),
        })?;
    if !user.is_admin() && allocation.account_id != user.id {
        return Err(Error::Forbidden {
            message: "Only the borrower or an administrator can return this tool".to_string(),
        });
    }
    if !allocation.is_open() {
        return Err(Error::BadRequest {
            message: "This tool has already been returned".to_string(),
        });
    }

    let returned = allocations.mark_returned(id).await?;
    Ok(Json(returned.into()))
}

/// List allocations. Non-admin callers only ever see their own.
#[utoipa::path(
    get,
    path = "/api/v1/allocations",
    tag = "allocations",
    params(ListAllocationsQuery),
    responses((status = 200, description = "Allocations", body = Vec<AllocationResponse>))
)]
#[instrument(skip_all)]
pub async fn list_allocations(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListAllocationsQuery>,
) -> Result<Json<Vec<AllocationResponse>>, Error> {
    let account_id = if user.is_admin() {
        query.account_id
    } else {
        Some(user.id)
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let allocations = Allocations::new(&mut conn)
        .list(&AllocationFilter {
            account_id,
            tool_id: query.tool_id,
            open_only: query.open_only,
            skip: query.skip,
            limit: query.limit,
        })
        .await?;
    Ok(Json(allocations.into_iter().map(Into::into).collect()))
}

/// Fetch an allocation by id.
#[utoipa::path(
    get,
    path = "/api/v1/allocations/{id}",
    tag = "allocations",
    params(("id" = String, Path, format = "uuid")),
    responses(
        (status = 200, description = "Allocation", body = AllocationResponse),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "No such allocation"),
    )
)]
#[instrument(skip_all, fields(allocation_id = %id))]
pub async fn get_allocation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AllocationId>,
) -> Result<Json<AllocationResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let allocation = Allocations::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Allocation".to_string(),
            id: id.to_string(),
        })?;
    if !user.is_admin() && allocation.account_id != user.id {
        return Err(Error::Forbidden {
            message: "Only the borrower or an administrator can view this allocation".to_string(),
        });
    }
    Ok(Json(allocation.into()))
}
