//! # ToolSync: shared tool inventory with email-verified registration
//!
//! ToolSync tracks a workshop's shared tools: who may borrow them, which are
//! out, and when they are due back. It exposes a REST API over PostgreSQL,
//! with session-cookie authentication and two roles (admin and standard).
//!
//! ## Registration
//!
//! The distinguishing piece is how accounts come to exist. Submitting the
//! registration form creates nothing: the validated name, email, and Argon2
//! password hash are sealed into an AES-256-GCM payload, wrapped in an
//! HMAC-signed expiring link, and emailed to the address given. Opening the
//! link is what creates the account, so a verified email is a precondition
//! of existence rather than a flag to backfill. The server keeps no record
//! of issued links; a short-lived pending session (for the "resend email"
//! button) is the only state a submit leaves behind, and losing it costs
//! nothing but the resend button.
//!
//! Failed verification attempts, whether tampered, forged, or expired, are
//! answered with a silent redirect to the landing page: probing the endpoint
//! yields no oracle.
//!
//! ## Layout
//!
//! - [`registration`]: payload codec, signed links, pending sessions
//! - [`auth`]: password hashing, acceptance rules, JWT session cookies
//! - [`api`]: axum handlers and request/response models
//! - [`db`]: repositories over PostgreSQL
//! - [`config`]: figment-based configuration
//!
//! ## Usage
//!
//! ```ignore
//! use toolsync::{Application, Config};
//!
//! let config = Config::load("config.yaml")?;
//! let app = Application::new(config).await?;
//! app.serve(shutdown_signal()).await?;
//! ```

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use bon::Builder;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod errors;
mod openapi;
pub mod registration;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use crate::api::models::accounts::{AccountStatus, Role};
use crate::auth::rules::CompromisedPasswords;
use crate::config::CorsOrigin;
use crate::db::handlers::{Accounts, Repository};
use crate::db::models::accounts::{AccountCreateDBRequest, AccountUpdateDBRequest};
use crate::email::Mailer;
use crate::openapi::ApiDoc;
use crate::registration::{link::SignedLinks, payload::PayloadCodec, pending::PendingStore};
use crate::types::AccountId;

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Codec for the encrypted registration payloads.
    pub codec: PayloadCodec,
    /// Signer for expiring verification links.
    pub links: SignedLinks,
    /// Pending registration sessions backing the resend action.
    pub pending: PendingStore,
    /// Outbound email transport.
    pub mailer: Mailer,
    /// Client for the compromised-password range API.
    pub password_checker: CompromisedPasswords,
}

impl AppState {
    /// Derive the registration primitives from config and assemble the state.
    pub fn from_config(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let secret = config
            .secret_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("secret_key is required"))?;
        let codec = PayloadCodec::new(&secret);
        let links = SignedLinks::new(&secret, &config.app_url);
        let pending = PendingStore::new(config.auth.registration.pending_session_ttl);
        let mailer = Mailer::new(&config)?;
        let password_checker = CompromisedPasswords::new(
            config.auth.registration.compromised_check.api_base_url.clone(),
        );
        Ok(AppState::builder()
            .db(db)
            .config(config)
            .codec(codec)
            .links(links)
            .pending(pending)
            .mailer(mailer)
            .password_checker(password_checker)
            .build())
    }
}

/// Database migrator for the bundled migrations.
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Ensure the configured admin account exists, is active, and holds the
/// admin role. Idempotent; an existing account gets its password refreshed
/// when `admin_password` is set.
pub async fn create_initial_admin_account(config: &Config, pool: &PgPool) -> anyhow::Result<AccountId> {
    let password_hash = match &config.admin_password {
        Some(password) => {
            let password = password.clone();
            let params = auth::password::Argon2Params::from(&config.auth.password);
            Some(
                tokio::task::spawn_blocking(move || {
                    auth::password::hash_string_with_params(&password, Some(params))
                })
                .await??,
            )
        }
        None => None,
    };

    let mut tx = pool.begin().await?;
    let mut accounts = Accounts::new(&mut tx);

    let id = match accounts.get_by_email(&config.admin_email).await? {
        Some(existing) => {
            let update = AccountUpdateDBRequest {
                role: Some(Role::Admin),
                status: Some(AccountStatus::Active),
                password_hash,
                ..Default::default()
            };
            accounts.update(existing.id, &update).await?.id
        }
        None => {
            let created = accounts
                .create(&AccountCreateDBRequest {
                    name: "Administrator".to_string(),
                    email: config.admin_email.clone(),
                    password_hash,
                    provider: None,
                    provider_id: None,
                    role: Role::Admin,
                    status: AccountStatus::Active,
                    email_verified_at: Some(chrono::Utc::now()),
                })
                .await?;
            info!(email = %config.admin_email, "Created initial admin account");
            created.id
        }
    };

    tx.commit().await?;
    Ok(id)
}

/// Connect to the database, apply migrations, and bootstrap the admin.
pub async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(&config.database_url).await?;
    migrator().run(&pool).await?;
    create_initial_admin_account(config, &pool).await?;
    Ok(pool)
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.cors.allow_credentials)
        .expose_headers(vec![axum::http::header::LOCATION])
        .max_age(config.auth.cors.max_age))
}

/// Build the application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    // The verification endpoint sits behind the signature check; the handler
    // never sees an unsigned request.
    let verify_guard = from_fn_with_state(state.clone(), registration::link::require_signed_link);

    let auth_routes = Router::new()
        .route("/register", post(api::handlers::auth::register))
        .route(
            "/register/resend",
            post(api::handlers::auth::resend_verification),
        )
        .route(
            "/register/verify",
            get(api::handlers::auth::verify_email).layer(verify_guard),
        )
        .route("/login", post(api::handlers::auth::login))
        .route("/logout", post(api::handlers::auth::logout));

    let api_routes = Router::new()
        .route("/accounts", get(api::handlers::accounts::list_accounts))
        .route(
            "/accounts/me",
            get(api::handlers::accounts::current_account),
        )
        .route(
            "/accounts/{id}",
            get(api::handlers::accounts::get_account)
                .patch(api::handlers::accounts::update_account)
                .delete(api::handlers::accounts::delete_account),
        )
        .route(
            "/categories",
            get(api::handlers::tools::list_categories)
                .post(api::handlers::tools::create_category),
        )
        .route(
            "/categories/{id}",
            axum::routing::delete(api::handlers::tools::delete_category),
        )
        .route(
            "/tools",
            get(api::handlers::tools::list_tools).post(api::handlers::tools::create_tool),
        )
        .route(
            "/tools/{id}",
            get(api::handlers::tools::get_tool)
                .patch(api::handlers::tools::update_tool)
                .delete(api::handlers::tools::delete_tool),
        )
        .route(
            "/tools/{id}/allocations",
            post(api::handlers::allocations::checkout_tool),
        )
        .route(
            "/allocations",
            get(api::handlers::allocations::list_allocations),
        )
        .route(
            "/allocations/{id}",
            get(api::handlers::allocations::get_allocation),
        )
        .route(
            "/allocations/{id}/return",
            post(api::handlers::allocations::return_tool),
        );

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The application: a configured router plus the resources behind it.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Initialize all resources: database, migrations, admin bootstrap,
    /// router.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;
        let state = AppState::from_config(pool.clone(), config.clone())?;
        let router = build_router(state)?;

        Ok(Self {
            router,
            config,
            pool,
        })
    }

    /// Bind and serve until the shutdown future resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "ToolSync listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
