//! API request/response models for allocations.

use crate::db::models::allocations::AllocationDBResponse;
use crate::types::{AccountId, AllocationId, ToolId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AllocationCreate {
    /// Check the tool out to another account. Admin only; everyone else
    /// checks out to themselves.
    #[schema(value_type = Option<String>, format = "uuid")]
    pub account_id: Option<AccountId>,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AllocationId,
    #[schema(value_type = String, format = "uuid")]
    pub tool_id: ToolId,
    #[schema(value_type = String, format = "uuid")]
    pub account_id: AccountId,
    pub allocated_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl From<AllocationDBResponse> for AllocationResponse {
    fn from(db: AllocationDBResponse) -> Self {
        Self {
            id: db.id,
            tool_id: db.tool_id,
            account_id: db.account_id,
            allocated_at: db.allocated_at,
            due_at: db.due_at,
            returned_at: db.returned_at,
        }
    }
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListAllocationsQuery {
    /// Admin only; other callers always see their own allocations.
    #[param(value_type = Option<String>, format = "uuid")]
    pub account_id: Option<AccountId>,
    #[param(value_type = Option<String>, format = "uuid")]
    pub tool_id: Option<ToolId>,
    #[serde(default)]
    pub open_only: bool,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
