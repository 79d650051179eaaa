//! Request and response data structures for the HTTP API.

pub mod accounts;
pub mod allocations;
pub mod auth;
pub mod tools;
