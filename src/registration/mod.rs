//! The signed-link registration protocol.
//!
//! Registration is completed out of band: submitting the form does not create
//! an account, it emails a link that does. The pieces:
//!
//! - [`payload`]: AES-256-GCM codec for the registration data carried inside
//!   the link
//! - [`link`]: HMAC-signed, expiring verification URLs and the middleware
//!   that guards the verification endpoint
//! - [`pending`]: short-lived sessions backing the "resend email" action
//!
//! No issued link is ever recorded server side. Any number of links can be
//! outstanding for the same email; each stays usable until its own expiry,
//! and whichever arrives first creates the account.

pub mod link;
pub mod payload;
pub mod pending;
