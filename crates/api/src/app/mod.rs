//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: orchestrator wiring and bootstrap seeding
//! - `routes/`: HTTP routes + handlers (one file per resource area)
//! - `dto.rs`: request extractors and query parameters
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use accountd_auth::{Hs256Jwt, IdentityResolver, PasswordHashError};
use accountd_core::DomainError;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("password hasher configuration rejected: {0}")]
    Hasher(#[from] PasswordHashError),

    #[error("bootstrap admin could not be seeded: {0}")]
    Seed(#[from] DomainError),
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, StartupError> {
    let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes(), config.token_ttl));
    let auth_state = middleware::AuthState {
        resolver: IdentityResolver::new(jwt.clone()),
    };

    let services = Arc::new(services::build_services(config, jwt).await?);

    // Protected routes: every request must carry a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth", post(routes::auth::authenticate))
        .layer(Extension(services));

    Ok(Router::new().merge(public).merge(protected).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.request_timeout)),
    ))
}
