//! Authentication: password hashing, acceptance rules, and JWT sessions.
//!
//! - [`password`]: Argon2id hashing and verification
//! - [`rules`]: password acceptance rules and the compromised-password check
//! - [`session`]: JWT session token creation and verification
//! - [`current_user`]: extractors for the authenticated caller
//!
//! Sessions are stateless JWTs carried in an HTTP-only cookie. Handlers take
//! [`crate::api::models::accounts::CurrentUser`] as an extractor for any
//! authenticated route, or [`current_user::AdminUser`] where the admin role
//! is required.

pub mod current_user;
pub mod password;
pub mod rules;
pub mod session;
