//! Database models for tools and categories.

use crate::api::models::tools::ToolStatus;
use crate::types::{AccountId, CategoryId, ToolId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ToolCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: ToolStatus,
    pub added_by: Option<AccountId>,
}

#[derive(Debug, Clone, Default)]
pub struct ToolUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: Option<ToolStatus>,
}

#[derive(Debug, Clone)]
pub struct ToolDBResponse {
    pub id: ToolId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: ToolStatus,
    pub added_by: Option<AccountId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CategoryCreateDBRequest {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CategoryDBResponse {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
