//! Shared helpers for handler and repository tests.

use axum_test::TestServer;
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    api::models::accounts::{AccountStatus, CurrentUser, Role},
    auth::password::{hash_string_with_params, Argon2Params},
    auth::session::create_session_token,
    config::{Config, EmailTransportConfig},
    db::handlers::{Accounts, Repository},
    db::models::accounts::{AccountCreateDBRequest, AccountDBResponse},
    AppState,
};

/// Satisfies the default acceptance rules (three character classes, length).
pub const TEST_PASSWORD: &str = "Sturdy-Passw0rd";

fn fast_argon2() -> Argon2Params {
    Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key".to_string()),
        app_url: "http://localhost:8080".to_string(),
        ..Default::default()
    };
    config.auth.registration.compromised_check.enabled = false;
    config.auth.password.argon2_memory_kib = 1024;
    config.auth.password.argon2_iterations = 1;
    config.auth.session.cookie_secure = false;
    config.email.transport = EmailTransportConfig::File {
        path: std::env::temp_dir().to_string_lossy().into_owned(),
    };
    config
}

/// A test server plus the state behind it, so tests can mint payload tokens
/// and signed links against the same secret the server verifies with.
pub async fn create_test_app(pool: PgPool) -> (TestServer, AppState) {
    let state = AppState::from_config(pool, create_test_config()).expect("test state");
    let router = crate::build_router(state.clone()).expect("test router");
    (TestServer::new(router).expect("test server"), state)
}

pub async fn create_test_account(pool: &PgPool, role: Role, email: &str) -> AccountDBResponse {
    let mut conn = pool.acquire().await.expect("acquire connection");
    Accounts::new(&mut conn)
        .create(&AccountCreateDBRequest {
            name: "Test Account".to_string(),
            email: email.to_string(),
            password_hash: Some(
                hash_string_with_params(TEST_PASSWORD, Some(fast_argon2())).expect("hash"),
            ),
            provider: None,
            provider_id: None,
            role,
            status: AccountStatus::Active,
            email_verified_at: Some(Utc::now()),
        })
        .await
        .expect("create test account")
}

/// A ready-to-send Cookie header value holding a valid session.
pub fn session_cookie_for(account: &AccountDBResponse, config: &Config) -> String {
    let user: CurrentUser = account.clone().into();
    let token = create_session_token(&user, config).expect("session token");
    format!("{}={}", config.auth.session.cookie_name, token)
}
