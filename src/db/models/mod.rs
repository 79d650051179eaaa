//! Database record structures.
//!
//! These are the shapes repositories accept and return. They mirror table
//! columns, not API payloads; conversions to API models live in
//! [`crate::api::models`].

pub mod accounts;
pub mod allocations;
pub mod tools;
