//! Account management handlers.
//!
//! Listing, updating, and deleting accounts is admin-only. Any authenticated
//! caller can fetch themselves via `/accounts/me` or their own record by id.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::{
    api::models::accounts::{
        AccountResponse, AccountUpdate, CurrentUser, ListAccountsQuery,
    },
    auth::current_user::AdminUser,
    db::{
        errors::DbError,
        handlers::{accounts::AccountFilter, Accounts, Repository},
        models::accounts::AccountUpdateDBRequest,
    },
    errors::Error,
    types::AccountId,
    AppState,
};

/// List accounts.
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    tag = "accounts",
    params(ListAccountsQuery),
    responses(
        (status = 200, description = "Accounts", body = Vec<AccountResponse>),
        (status = 403, description = "Admin role required"),
    )
)]
#[instrument(skip_all)]
pub async fn list_accounts(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<Vec<AccountResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let accounts = Accounts::new(&mut conn)
        .list(&AccountFilter::new(query.skip, query.limit))
        .await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// The authenticated caller's own account.
#[utoipa::path(
    get,
    path = "/api/v1/accounts/me",
    tag = "accounts",
    responses(
        (status = 200, description = "Own account", body = AccountResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[instrument(skip_all)]
pub async fn current_account(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<AccountResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let account = Accounts::new(&mut conn)
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Account".to_string(),
            id: user.id.to_string(),
        })?;
    Ok(Json(account.into()))
}

/// Fetch an account by id. Admins can fetch anyone; others only themselves.
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(("id" = String, Path, format = "uuid")),
    responses(
        (status = 200, description = "Account", body = AccountResponse),
        (status = 403, description = "Not the caller's own account"),
        (status = 404, description = "No such account"),
    )
)]
#[instrument(skip_all, fields(account_id = %id))]
pub async fn get_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AccountId>,
) -> Result<Json<AccountResponse>, Error> {
    if !user.is_admin() && user.id != id {
        return Err(Error::Forbidden {
            message: "You can only view your own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let account = Accounts::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Account".to_string(),
            id: id.to_string(),
        })?;
    Ok(Json(account.into()))
}

/// Update an account's name, role, or status.
#[utoipa::path(
    patch,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(("id" = String, Path, format = "uuid")),
    request_body = AccountUpdate,
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such account"),
    )
)]
#[instrument(skip_all, fields(account_id = %id))]
pub async fn update_account(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<AccountId>,
    Json(request): Json<AccountUpdate>,
) -> Result<Json<AccountResponse>, Error> {
    // Admins cannot demote or deactivate themselves.
    if admin.id == id
        && (matches!(request.role, Some(role) if role != admin.role)
            || matches!(
                request.status,
                Some(crate::api::models::accounts::AccountStatus::Inactive)
            ))
    {
        return Err(Error::BadRequest {
            message: "You cannot change your own role or deactivate yourself".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let account = Accounts::new(&mut conn)
        .update(
            id,
            &AccountUpdateDBRequest {
                name: request.name,
                role: request.role,
                status: request.status,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| match e {
            DbError::NotFound => Error::NotFound {
                resource: "Account".to_string(),
                id: id.to_string(),
            },
            other => other.into(),
        })?;
    Ok(Json(account.into()))
}

/// Delete an account.
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(("id" = String, Path, format = "uuid")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such account"),
    )
)]
#[instrument(skip_all, fields(account_id = %id))]
pub async fn delete_account(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<AccountId>,
) -> Result<StatusCode, Error> {
    if admin.id == id {
        return Err(Error::BadRequest {
            message: "You cannot delete your own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let deleted = Accounts::new(&mut conn).delete(id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Account".to_string(),
            id: id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
