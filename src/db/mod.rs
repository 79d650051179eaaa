//! Database layer for data persistence and access.
//!
//! Built on SQLx over PostgreSQL, following the repository pattern:
//!
//! - [`handlers`]: repository implementations (query construction, binding)
//! - [`models`]: record structures matching table schemas
//! - [`errors`]: database-specific error classification
//!
//! Repositories wrap a `&mut PgConnection`, so they work equally over a
//! pooled connection or an open transaction. Multi-statement operations
//! (registration verification, tool checkout) run inside a transaction begun
//! by the handler.
//!
//! Migrations live in `migrations/` and are applied at startup through
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
