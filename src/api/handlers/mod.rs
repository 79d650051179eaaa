//! Axum route handlers.

pub mod accounts;
pub mod allocations;
pub mod auth;
pub mod tools;
