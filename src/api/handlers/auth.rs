//! Registration, login, and logout handlers.
//!
//! Submitting the registration form never creates an account. It validates
//! the input, emails a signed verification link carrying an encrypted
//! payload, and stashes a pending session for resends. The account is
//! created when the link is opened.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{Acquire, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    api::models::{
        accounts::{AccountResponse, AccountStatus, CurrentUser, Role},
        auth::{AuthResponse, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest},
    },
    auth::{password, rules, session},
    config::Config,
    db::{
        errors::DbError,
        handlers::{Accounts, Repository},
        models::accounts::{AccountCreateDBRequest, AccountDBResponse, AccountUpdateDBRequest},
    },
    errors::Error,
    registration::{payload::RegistrationPayload, pending::PendingRegistration},
    AppState,
};

const FLASH_STATUS_COOKIE: &str = "flash_status";
const FLASH_EMAIL_COOKIE: &str = "flash_email";
const FLASH_ERROR_COOKIE: &str = "flash_error";

/// One-shot cookie the landing page reads to render a notice.
fn flash_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; Max-Age=60; SameSite=Lax")
}

fn create_session_cookie(token: &str, config: &Config) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age={}",
        config.auth.session.cookie_name,
        token,
        config.auth.session.cookie_secure,
        config.auth.session.cookie_same_site,
        config.auth.session.timeout.as_secs(),
    )
}

/// Locate the pending-registration session id in the Cookie header.
fn registration_session_id(headers: &HeaderMap, config: &Config) -> Option<Uuid> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let cookie_name = &config.auth.registration.registration_cookie_name;
    for cookie in cookies.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name == cookie_name {
                return Uuid::parse_str(value).ok();
            }
        }
    }
    None
}

/// 303 back to the landing page announcing that a link went out.
fn verification_sent_response(state: &AppState, session_id: Uuid, email: &str) -> Response {
    let registration = &state.config.auth.registration;
    let session_cookie = format!(
        "{}={}; Path=/; HttpOnly; Secure={}; SameSite=Lax; Max-Age={}",
        registration.registration_cookie_name,
        session_id,
        state.config.auth.session.cookie_secure,
        registration.pending_session_ttl.as_secs(),
    );

    (
        StatusCode::SEE_OTHER,
        AppendHeaders([
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, session_cookie),
            (
                header::SET_COOKIE,
                flash_cookie(FLASH_STATUS_COOKIE, "verification-link-sent"),
            ),
            (header::SET_COOKIE, flash_cookie(FLASH_EMAIL_COOKIE, email)),
        ]),
    )
        .into_response()
}

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

/// Submit a registration.
#[utoipa::path(
    post,
    path = "/register",
    tag = "registration",
    request_body = RegisterRequest,
    responses(
        (status = 303, description = "Verification link emailed; redirect to landing page"),
        (status = 400, description = "Registration is disabled"),
        (status = 422, description = "Validation failed"),
    )
)]
#[instrument(skip_all, fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, Error> {
    if !state.config.auth.registration.enabled {
        return Err(Error::BadRequest {
            message: "Registration is disabled".to_string(),
        });
    }

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Validation {
            field: "name",
            message: "Name is required".to_string(),
        });
    }
    if name.chars().count() > 255 {
        return Err(Error::Validation {
            field: "name",
            message: "Name must be at most 255 characters".to_string(),
        });
    }

    let email = request.email.trim().to_lowercase();
    let looks_like_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !looks_like_email {
        return Err(Error::Validation {
            field: "email",
            message: "Enter a valid email address".to_string(),
        });
    }

    rules::validate_password(
        &request.password,
        &request.password_confirmation,
        &state.config.auth.password,
    )?;

    if state.config.auth.registration.compromised_check.enabled {
        match state.password_checker.is_compromised(&request.password).await {
            Ok(true) => {
                return Err(Error::Validation {
                    field: "password",
                    message: "This password has appeared in a data breach and cannot be used"
                        .to_string(),
                });
            }
            Ok(false) => {}
            // The range API being down must not block sign-ups.
            Err(e) => tracing::warn!("compromised-password check unavailable: {e:#}"),
        }
    }

    {
        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        let mut accounts = Accounts::new(&mut conn);
        if accounts.get_by_email(&email).await?.is_some() {
            return Err(Error::Validation {
                field: "email",
                message: "An account with this email address already exists".to_string(),
            });
        }
    }

    let to_hash = request.password.clone();
    let params = password::Argon2Params::from(&state.config.auth.password);
    let password_hash =
        tokio::task::spawn_blocking(move || password::hash_string_with_params(&to_hash, Some(params)))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password hashing task: {e}"),
            })??;

    let payload = RegistrationPayload {
        name: name.clone(),
        email: email.clone(),
        password_hash,
    };
    let payload_token = state.codec.encode(&payload)?;
    let link = state.links.verification_link(
        &payload_token,
        state.config.auth.registration.verification_link_ttl,
        Utc::now(),
    );

    // Delivery happens before the pending session is stored; a failed send
    // fails the whole submit.
    state
        .mailer
        .send_verification_email(
            &email,
            Some(&name),
            &link,
            state.config.auth.registration.verification_link_ttl,
        )
        .await?;

    let session_id = state
        .pending
        .put(PendingRegistration {
            payload_token,
            email: email.clone(),
            name,
        })
        .await;

    tracing::info!("verification link sent");
    Ok(verification_sent_response(&state, session_id, &email))
}

/// Re-send the verification email for the pending registration.
#[utoipa::path(
    post,
    path = "/register/resend",
    tag = "registration",
    responses(
        (status = 303, description = "Link re-sent, or the pending session has expired"),
    )
)]
#[instrument(skip_all)]
pub async fn resend_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, Error> {
    let pending = match registration_session_id(&headers, &state.config) {
        Some(id) => state.pending.get(id).await,
        None => None,
    };
    let Some(pending) = pending else {
        return Ok((
            StatusCode::SEE_OTHER,
            AppendHeaders([
                (header::LOCATION, "/".to_string()),
                (
                    header::SET_COOKIE,
                    flash_cookie(FLASH_ERROR_COOKIE, "verification-session-expired"),
                ),
            ]),
        )
            .into_response());
    };

    // The original payload token is re-signed with a fresh expiry. Earlier
    // links stay valid until their own expiries.
    let ttl = state.config.auth.registration.verification_link_ttl;
    let link = state
        .links
        .verification_link(&pending.payload_token, ttl, Utc::now());
    state
        .mailer
        .send_verification_email(&pending.email, Some(&pending.name), &link, ttl)
        .await?;

    tracing::info!("verification link re-sent");
    Ok((
        StatusCode::SEE_OTHER,
        AppendHeaders([
            (header::LOCATION, "/".to_string()),
            (
                header::SET_COOKIE,
                flash_cookie(FLASH_STATUS_COOKIE, "verification-link-sent"),
            ),
            (
                header::SET_COOKIE,
                flash_cookie(FLASH_EMAIL_COOKIE, &pending.email),
            ),
        ]),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(default)]
    pub payload: String,
}

/// Bring an existing account in line with a verified payload. The email is
/// marked verified; the carried password hash is adopted only when the
/// account has none, so a set password is never overwritten by an old link.
async fn adopt_verified_payload(
    accounts: &mut Accounts<'_>,
    existing: AccountDBResponse,
    payload: &RegistrationPayload,
) -> Result<AccountDBResponse, Error> {
    if existing.password_hash.is_some() {
        return Ok(accounts.mark_email_verified(existing.id).await?);
    }
    let update = AccountUpdateDBRequest {
        email_verified_at: existing.email_verified_at.is_none().then(Utc::now),
        password_hash: Some(payload.password_hash.clone()),
        ..Default::default()
    };
    Ok(accounts.update(existing.id, &update).await?)
}

/// Create the account the payload describes, or adopt the one a concurrent
/// verification of the same email just created. The INSERT runs on a
/// savepoint: losing the race aborts only the savepoint, and the recovery
/// read still has a live transaction to run on.
async fn create_or_adopt_account(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
    payload: &RegistrationPayload,
) -> Result<AccountDBResponse, Error> {
    let create = AccountCreateDBRequest {
        name: payload.name.clone(),
        email: email.to_string(),
        password_hash: Some(payload.password_hash.clone()),
        provider: None,
        provider_id: None,
        role: Role::Standard,
        status: AccountStatus::Active,
        email_verified_at: Some(Utc::now()),
    };

    let mut savepoint = tx.begin().await.map_err(DbError::from)?;
    let created = Accounts::new(&mut savepoint).create(&create).await;
    match created {
        Ok(created) => {
            savepoint.commit().await.map_err(DbError::from)?;
            Ok(created)
        }
        Err(DbError::UniqueViolation { .. }) => {
            savepoint.rollback().await.map_err(DbError::from)?;
            let mut accounts = Accounts::new(tx);
            let existing = accounts
                .get_by_email(email)
                .await?
                .ok_or(DbError::NotFound)?;
            adopt_verified_payload(&mut accounts, existing, payload).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Complete a registration from a signed verification link.
///
/// The signature middleware has already vouched for the link. Anything wrong
/// beyond that point still redirects home without comment.
#[utoipa::path(
    get,
    path = "/register/verify",
    tag = "registration",
    params(
        ("payload" = String, Query, description = "Encrypted registration payload"),
        ("expires" = i64, Query, description = "Unix timestamp the link expires at"),
        ("signature" = String, Query, description = "HMAC signature over path, payload, and expiry"),
    ),
    responses(
        (status = 303, description = "Account created and logged in, or silently bounced home"),
    )
)]
#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<VerifyParams>,
) -> Result<Response, Error> {
    if params.payload.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }
    let payload = match state.codec.decode(&params.payload) {
        Ok(payload) => payload,
        Err(reason) => {
            tracing::info!(%reason, "discarding verification payload");
            return Ok(Redirect::to("/").into_response());
        }
    };
    if !payload.is_complete() {
        tracing::info!("discarding incomplete verification payload");
        return Ok(Redirect::to("/").into_response());
    }

    let email = payload.email.trim().to_lowercase();

    let mut tx = state.db.begin().await.map_err(DbError::from)?;

    let existing = Accounts::new(&mut tx).get_by_email(&email).await?;
    let account = match existing {
        Some(existing) => {
            let mut accounts = Accounts::new(&mut tx);
            adopt_verified_payload(&mut accounts, existing, &payload).await?
        }
        None => create_or_adopt_account(&mut tx, &email, &payload).await?,
    };
    tx.commit().await.map_err(DbError::from)?;

    if let Some(id) = registration_session_id(&headers, &state.config) {
        state.pending.clear(id).await;
    }

    let current: CurrentUser = account.clone().into();
    let token = session::create_session_token(&current, &state.config)?;
    let session_cookie = create_session_cookie(&token, &state.config);
    let expired_registration_cookie = format!(
        "{}=; Path=/; HttpOnly; Max-Age=0",
        state.config.auth.registration.registration_cookie_name
    );

    let destination = match account.role {
        Role::Admin => "/admin",
        Role::Standard => "/dashboard",
    };

    tracing::info!(account_id = %crate::types::abbrev_uuid(&account.id), "email verified");
    Ok((
        StatusCode::SEE_OTHER,
        AppendHeaders([
            (header::LOCATION, destination.to_string()),
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, expired_registration_cookie),
        ]),
    )
        .into_response())
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials, unverified email, or inactive account"),
    )
)]
#[instrument(skip_all, fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<LoginResponse, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut accounts = Accounts::new(&mut conn);

    let account = accounts
        .get_by_email(request.email.trim())
        .await?
        .ok_or_else(invalid_credentials)?;
    let hash = account
        .password_hash
        .clone()
        .ok_or_else(invalid_credentials)?;

    let candidate = request.password.clone();
    let valid =
        tokio::task::spawn_blocking(move || password::verify_string(&candidate, &hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password verification task: {e}"),
            })??;
    if !valid {
        return Err(invalid_credentials());
    }

    if account.email_verified_at.is_none() {
        return Err(Error::Unauthenticated {
            message: Some("Verify your email address before logging in".to_string()),
        });
    }
    if account.status != AccountStatus::Active {
        return Err(Error::Unauthenticated {
            message: Some("This account has been deactivated".to_string()),
        });
    }

    let current: CurrentUser = account.clone().into();
    let token = session::create_session_token(&current, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    tracing::info!(account_id = %crate::types::abbrev_uuid(&account.id), "login successful");
    Ok(LoginResponse {
        auth_response: AuthResponse {
            account: AccountResponse::from(account),
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Log out by expiring the session cookie.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    responses((status = 200, description = "Logged out"))
)]
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> LogoutResponse {
    LogoutResponse {
        cookie: format!(
            "{}=; Path=/; HttpOnly; Max-Age=0",
            state.config.auth.session.cookie_name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_account, create_test_app, TEST_PASSWORD};
    use serde_json::json;
    use sqlx::PgPool;

    fn set_cookies(response: &axum_test::TestResponse) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn location(response: &axum_test::TestResponse) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    fn register_body(email: &str) -> serde_json::Value {
        json!({
            "name": "Ada Lovelace",
            "email": email,
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
        })
    }

    /// Pull the path-and-query verification link out of the issued state.
    fn verification_path(state: &AppState, payload: &RegistrationPayload) -> String {
        let token = state.codec.encode(payload).unwrap();
        let link = state.links.verification_link(
            &token,
            state.config.auth.registration.verification_link_ttl,
            Utc::now(),
        );
        link.strip_prefix(state.config.app_url.trim_end_matches('/'))
            .unwrap()
            .to_string()
    }

    fn payload_for(email: &str) -> RegistrationPayload {
        RegistrationPayload {
            name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            password_hash: password::hash_string_with_params(
                TEST_PASSWORD,
                Some(password::Argon2Params {
                    memory_kib: 1024,
                    iterations: 1,
                    parallelism: 1,
                }),
            )
            .unwrap(),
        }
    }

    #[sqlx::test]
    async fn test_register_sends_link_without_creating_account(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;

        let response = server
            .post("/register")
            .json(&register_body("ada@example.com"))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let cookies = set_cookies(&response);
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("flash_status=verification-link-sent")));
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("flash_email=ada@example.com")));
        assert!(cookies.iter().any(|c| c.starts_with(
            state
                .config
                .auth
                .registration
                .registration_cookie_name
                .as_str()
        )));

        // No account until the link is opened.
        let mut conn = pool.acquire().await.unwrap();
        let account = Accounts::new(&mut conn)
            .get_by_email("ada@example.com")
            .await
            .unwrap();
        assert!(account.is_none());
    }

    #[sqlx::test]
    async fn test_register_rejects_duplicate_email(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        create_test_account(&pool, Role::Standard, "taken@example.com").await;

        let response = server
            .post("/register")
            .json(&register_body("taken@example.com"))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[sqlx::test]
    async fn test_register_rejects_overlong_name(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let response = server
            .post("/register")
            .json(&json!({
                "name": "A".repeat(256),
                "email": "ada@example.com",
                "password": TEST_PASSWORD,
                "password_confirmation": TEST_PASSWORD,
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json();
        assert!(body["errors"]["name"].is_array());
    }

    #[sqlx::test]
    async fn test_failed_delivery_fails_submit_and_leaves_no_session(pool: PgPool) {
        let mut config = crate::test_utils::create_test_config();
        // A file transport pointed at a directory that does not exist.
        config.email.transport = crate::config::EmailTransportConfig::File {
            path: "/nonexistent/toolsync-outbox".to_string(),
        };
        let state = crate::AppState::from_config(pool, config).unwrap();
        let server =
            axum_test::TestServer::new(crate::build_router(state.clone()).unwrap()).unwrap();

        let response = server
            .post("/register")
            .json(&register_body("ada@example.com"))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let cookie_prefix = format!(
            "{}=",
            state.config.auth.registration.registration_cookie_name
        );
        assert!(!set_cookies(&response)
            .iter()
            .any(|c| c.starts_with(&cookie_prefix)));

        // Nothing was stored, so there is nothing to resend.
        let response = server.post("/register/resend").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert!(set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("flash_error=verification-session-expired")));
    }

    #[sqlx::test]
    async fn test_register_rejects_weak_password(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let response = server
            .post("/register")
            .json(&json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "lowercaseonly",
                "password_confirmation": "lowercaseonly",
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json();
        assert!(body["errors"]["password"].is_array());
    }

    #[sqlx::test]
    async fn test_register_rejects_mismatched_confirmation(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let response = server
            .post("/register")
            .json(&json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": TEST_PASSWORD,
                "password_confirmation": "Different-Passw0rd",
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[sqlx::test]
    async fn test_register_disabled(pool: PgPool) {
        let (_, mut state) = create_test_app(pool).await;
        state.config.auth.registration.enabled = false;
        let server =
            axum_test::TestServer::new(crate::build_router(state).unwrap()).unwrap();

        let response = server
            .post("/register")
            .json(&register_body("ada@example.com"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_verify_creates_account_and_logs_in(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;
        let path = verification_path(&state, &payload_for("ada@example.com"));

        let response = server.get(&path).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");

        let cookies = set_cookies(&response);
        assert!(cookies
            .iter()
            .any(|c| c.starts_with(&format!("{}=", state.config.auth.session.cookie_name))
                && !c.contains("Max-Age=0")));

        let mut conn = pool.acquire().await.unwrap();
        let account = Accounts::new(&mut conn)
            .get_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(account.email_verified_at.is_some());
        assert_eq!(account.role, Role::Standard);
        assert_eq!(account.status, AccountStatus::Active);

        // The issued session cookie works against authenticated routes.
        let session = cookies
            .iter()
            .find(|c| c.starts_with(&format!("{}=", state.config.auth.session.cookie_name)))
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let me = server
            .get("/api/v1/accounts/me")
            .add_header(header::COOKIE, session)
            .await;
        me.assert_status_ok();
    }

    #[sqlx::test]
    async fn test_verify_expired_link_bounces_home(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;

        let token = state.codec.encode(&payload_for("ada@example.com")).unwrap();
        let issued = Utc::now() - chrono::Duration::hours(2);
        let link = state
            .links
            .verification_link(&token, std::time::Duration::from_secs(3600), issued);
        let path = link
            .strip_prefix(state.config.app_url.trim_end_matches('/'))
            .unwrap();

        let response = server.get(path).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let mut conn = pool.acquire().await.unwrap();
        assert!(Accounts::new(&mut conn)
            .get_by_email("ada@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[sqlx::test]
    async fn test_verify_tampered_payload_bounces_home(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;
        let path = verification_path(&state, &payload_for("ada@example.com"));

        let tampered = path.replace("payload=", "payload=X");
        let response = server.get(&tampered).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let mut conn = pool.acquire().await.unwrap();
        assert!(Accounts::new(&mut conn)
            .get_by_email("ada@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[sqlx::test]
    async fn test_verify_signed_garbage_payload_bounces_home(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;

        // A correctly signed link around a token that never decodes.
        let link = state.links.verification_link(
            "bm90LXJlYWwtY2lwaGVydGV4dA",
            std::time::Duration::from_secs(3600),
            Utc::now(),
        );
        let path = link
            .strip_prefix(state.config.app_url.trim_end_matches('/'))
            .unwrap();

        let response = server.get(path).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[sqlx::test]
    async fn test_verify_link_stays_valid_after_resend(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;
        let payload = payload_for("ada@example.com");

        // Two links for the same registration, issued at different times.
        let first = verification_path(&state, &payload);
        let second = verification_path(&state, &payload);

        let response = server.get(&first).await;
        assert_eq!(location(&response), "/dashboard");

        // The other link still completes; the account already exists, so it
        // lands on the existing-account path and logs in again.
        let response = server.get(&second).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
    }

    #[sqlx::test]
    async fn test_verify_existing_account_adopts_hash_only_if_none(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;

        // An OAuth-style account: no password, unverified email.
        let mut conn = pool.acquire().await.unwrap();
        let oauth_account = Accounts::new(&mut conn)
            .create(&AccountCreateDBRequest {
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                password_hash: None,
                provider: None,
                provider_id: None,
                role: Role::Standard,
                status: AccountStatus::Active,
                email_verified_at: None,
            })
            .await
            .unwrap();
        drop(conn);

        let path = verification_path(&state, &payload_for("grace@example.com"));
        server.get(&path).await.assert_status(StatusCode::SEE_OTHER);

        let mut conn = pool.acquire().await.unwrap();
        let account = Accounts::new(&mut conn)
            .get_by_email("grace@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.id, oauth_account.id);
        assert!(account.email_verified_at.is_some());
        let adopted_hash = account.password_hash.clone().unwrap();
        drop(conn);

        // A second, older link must not replace the now-set password.
        let other_payload = RegistrationPayload {
            password_hash: "different-hash".to_string(),
            ..payload_for("grace@example.com")
        };
        let path = verification_path(&state, &other_payload);
        server.get(&path).await.assert_status(StatusCode::SEE_OTHER);

        let mut conn = pool.acquire().await.unwrap();
        let account = Accounts::new(&mut conn)
            .get_by_email("grace@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.password_hash.unwrap(), adopted_hash);
    }

    #[sqlx::test]
    async fn test_verify_lost_create_race_recovers_existing_account(pool: PgPool) {
        let payload = payload_for("race@example.com");

        let mut tx = pool.begin().await.unwrap();
        assert!(Accounts::new(&mut tx)
            .get_by_email("race@example.com")
            .await
            .unwrap()
            .is_none());

        // A concurrent verification of the same email commits first.
        let winner = create_test_account(&pool, Role::Standard, "race@example.com").await;

        let account = create_or_adopt_account(&mut tx, "race@example.com", &payload)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(account.id, winner.id);
        assert!(account.email_verified_at.is_some());
    }

    #[sqlx::test]
    async fn test_resend_with_active_session(pool: PgPool) {
        let (server, state) = create_test_app(pool).await;

        let response = server
            .post("/register")
            .json(&register_body("ada@example.com"))
            .await;
        let registration_cookie = set_cookies(&response)
            .into_iter()
            .find(|c| {
                c.starts_with(&format!(
                    "{}=",
                    state.config.auth.registration.registration_cookie_name
                ))
            })
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let response = server
            .post("/register/resend")
            .add_header(header::COOKIE, registration_cookie)
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        let cookies = set_cookies(&response);
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("flash_status=verification-link-sent")));
    }

    #[sqlx::test]
    async fn test_resend_without_session_flashes_error(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let response = server.post("/register/resend").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        assert!(set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("flash_error=verification-session-expired")));
    }

    #[sqlx::test]
    async fn test_login_success(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        create_test_account(&pool, Role::Standard, "ada@example.com").await;

        let response = server
            .post("/login")
            .json(&json!({ "email": "ada@example.com", "password": TEST_PASSWORD }))
            .await;
        response.assert_status_ok();
        let body: AuthResponse = response.json();
        assert_eq!(body.account.email, "ada@example.com");
        assert!(set_cookies(&response)
            .iter()
            .any(|c| c.contains("HttpOnly")));
    }

    #[sqlx::test]
    async fn test_login_wrong_password(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        create_test_account(&pool, Role::Standard, "ada@example.com").await;

        let response = server
            .post("/login")
            .json(&json!({ "email": "ada@example.com", "password": "Wrong-Passw0rd" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_login_unverified_email(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;

        let mut conn = pool.acquire().await.unwrap();
        Accounts::new(&mut conn)
            .create(&AccountCreateDBRequest {
                name: "Unverified".to_string(),
                email: "pending@example.com".to_string(),
                password_hash: Some(
                    password::hash_string_with_params(
                        TEST_PASSWORD,
                        Some(password::Argon2Params::from(&state.config.auth.password)),
                    )
                    .unwrap(),
                ),
                provider: None,
                provider_id: None,
                role: Role::Standard,
                status: AccountStatus::Active,
                email_verified_at: None,
            })
            .await
            .unwrap();

        let response = server
            .post("/login")
            .json(&json!({ "email": "pending@example.com", "password": TEST_PASSWORD }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_login_inactive_account(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let account = create_test_account(&pool, Role::Standard, "ada@example.com").await;

        let mut conn = pool.acquire().await.unwrap();
        Accounts::new(&mut conn)
            .update(
                account.id,
                &AccountUpdateDBRequest {
                    status: Some(AccountStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let response = server
            .post("/login")
            .json(&json!({ "email": "ada@example.com", "password": TEST_PASSWORD }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_logout_expires_cookie(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let response = server.post("/logout").await;
        response.assert_status_ok();
        assert!(set_cookies(&response)
            .iter()
            .any(|c| c.contains("Max-Age=0")));
    }
}
