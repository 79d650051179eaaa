//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection`, provides strongly-typed CRUD
//! operations, and returns models from [`crate::db::models`]. All of them
//! except [`Categories`] implement the [`Repository`] trait.
//!
//! ```ignore
//! use toolsync::db::handlers::{Accounts, Repository};
//!
//! let mut tx = pool.begin().await?;
//! let mut accounts = Accounts::new(&mut tx);
//! let account = accounts.get_by_email("ada@example.com").await?;
//! tx.commit().await?;
//! ```

pub mod accounts;
pub mod allocations;
pub mod repository;
pub mod tools;

pub use accounts::Accounts;
pub use allocations::Allocations;
pub use repository::Repository;
pub use tools::{Categories, Tools};
