//! Extractors for the authenticated caller.
//!
//! [`CurrentUser`] reads the JWT session cookie; [`AdminUser`] additionally
//! requires the admin role. Both reject with [`Error`] so failures render
//! through the standard error responses.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use tracing::instrument;

use crate::{
    api::models::accounts::CurrentUser,
    auth::session::verify_session_token,
    config::Config,
    errors::{Error, Result},
    AppState,
};

/// Pull the session token out of the Cookie header, if present, and verify
/// it. `None` means no session cookie at all; `Some(Err(..))` means a cookie
/// was presented but did not verify.
fn try_jwt_session_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    let cookie_name = &config.auth.session.cookie_name;

    for cookie in cookies.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name == cookie_name {
                return Some(verify_session_token(value, config));
            }
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match try_jwt_session_auth(parts, &state.config) {
            Some(Ok(user)) => Ok(user),
            Some(Err(e)) => Err(e),
            None => Err(Error::Unauthenticated { message: None }),
        }
    }
}

/// An authenticated caller holding the admin role.
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(Error::Forbidden {
                message: "Administrator access required".to_string(),
            });
        }
        Ok(AdminUser(user))
    }
}
