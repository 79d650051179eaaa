//! API request/response models for tools and categories.

use crate::db::models::tools::{CategoryDBResponse, ToolDBResponse};
use crate::types::{AccountId, CategoryId, ToolId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "tool_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Available,
    Maintenance,
    Deprecated,
    Retired,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ToolCreate {
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    /// Defaults to `available` when omitted.
    pub status: Option<ToolStatus>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ToolUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    pub status: Option<ToolStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ToolId,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    pub status: ToolStatus,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub added_by: Option<AccountId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ToolDBResponse> for ToolResponse {
    fn from(db: ToolDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            category_id: db.category_id,
            status: db.status,
            added_by: db.added_by,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListToolsQuery {
    pub status: Option<ToolStatus>,
    #[param(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CategoryCreate {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryDBResponse> for CategoryResponse {
    fn from(db: CategoryDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            created_at: db.created_at,
        }
    }
}
