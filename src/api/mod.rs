//! HTTP API surface.
//!
//! - [`handlers`]: axum route handlers
//! - [`models`]: request/response data structures
//!
//! The registration and session endpoints live at the root (`/register`,
//! `/login`, ...); resource management sits under `/api/v1/*`. All endpoints
//! carry OpenAPI annotations; the rendered docs are served at `/docs`.

pub mod handlers;
pub mod models;
