//! Database models for tool allocations (checkouts).

use crate::types::{AccountId, AllocationId, ToolId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct AllocationCreateDBRequest {
    pub tool_id: ToolId,
    pub account_id: AccountId,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct AllocationUpdateDBRequest {
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct AllocationDBResponse {
    pub id: AllocationId,
    pub tool_id: ToolId,
    pub account_id: AccountId,
    pub allocated_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl AllocationDBResponse {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }
}
