//! Multi-user workout tracking API.
//!
//! Accounts log in with a password and receive an opaque bearer token. Every
//! request then goes through identity resolution, and mutations of a workout
//! are only allowed for its owner.

#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod crypto;
mod database;
pub mod error;
pub mod identity;
mod middleware;
pub mod ownership;
mod router;
pub mod store;
pub mod telemetry;
pub mod token;
pub mod user;
pub mod workout;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use crate::clock::SystemClock;
use crate::crypto::PasswordManager;
use crate::store::{PgStore, Store};
use crate::token::TokenManager;

pub use error::ServerError;

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub store: Arc<dyn Store>,
    pub passwords: Arc<PasswordManager>,
    pub tokens: TokenManager,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    let mut router = router::api()
        .route_layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        // Registered after `authenticate`, so never identity-resolved.
        .route("/health", get(router::status::health));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(router::status::metrics));
    }

    router
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    config: Arc<config::Configuration>,
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let Some(postgres) = &config.postgres else {
        return Err("missing `postgres` entry on `config.yaml` file and no `DATABASE_URL`".into());
    };

    let pool = database::connect(postgres).await?;
    // execute migrations scripts on start.
    database::migrate(&pool).await?;

    let passwords = Arc::new(PasswordManager::new(config.argon2.clone())?);
    let tokens = TokenManager::new(config.token.ttl(), Arc::new(SystemClock));

    Ok(AppState {
        store: Arc::new(PgStore::new(pool)),
        config,
        passwords,
        tokens,
        metrics,
    })
}

/// In-memory application used by handler tests.
#[cfg(test)]
pub(crate) struct Harness {
    pub state: AppState,
    pub store: Arc<store::memory::MemoryStore>,
    pub clock: Arc<clock::FixedClock>,
}

#[cfg(test)]
pub(crate) fn harness() -> Harness {
    let store = Arc::new(store::memory::MemoryStore::new());
    let clock = Arc::new(clock::FixedClock::new(chrono::Utc::now()));
    let config = Arc::new(config::Configuration::default());

    let state = AppState {
        tokens: TokenManager::new(config.token.ttl(), clock.clone()),
        passwords: Arc::new(crypto::test_manager()),
        store: store.clone(),
        config,
        metrics: None,
    };

    Harness {
        state,
        store,
        clock,
    }
}

/// Register `username` and return a fresh authentication token for it.
#[cfg(test)]
pub(crate) async fn register(
    state: &AppState,
    username: &str,
    password: &str,
) -> String {
    let password = state.passwords.hash(&crypto::Password::new(password)).unwrap();
    let user = state
        .store
        .create_user(user::NewUser {
            username: username.into(),
            email: format!("{username}@example.com"),
            password,
        })
        .await
        .unwrap();

    let token = state.tokens.issue(user.id).unwrap();
    state
        .store
        .store_token(&token.hash, token.user_id, token.expires_at, token.scope)
        .await
        .unwrap();

    token.plain.to_string()
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    token: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    let authorization = token.map(|token| format!("Bearer {token}"));
    send(authorization.as_deref(), app, method, path, body).await
}

/// Like [`make_request`] with a raw `Authorization` value.
#[cfg(test)]
pub async fn send(
    authorization: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        request = request.header(header::AUTHORIZATION, value);
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}
