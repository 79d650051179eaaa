//! Common type definitions used across the crate.
//!
//! All entity identifiers are UUIDs behind type aliases so signatures say
//! which entity they refer to:
//!
//! - [`AccountId`]: accounts (people who log in)
//! - [`ToolId`]: tools in the shared inventory
//! - [`CategoryId`]: tool categories
//! - [`AllocationId`]: checkout records

use uuid::Uuid;

pub type AccountId = Uuid;
pub type ToolId = Uuid;
pub type CategoryId = Uuid;
pub type AllocationId = Uuid;

/// Abbreviate a UUID to its first 8 characters for readable log output.
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
