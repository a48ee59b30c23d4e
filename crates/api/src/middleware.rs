use axum::{extract::State, http::HeaderMap, middleware::Next, response::Response};
use chrono::Utc;

use accountd_auth::IdentityResolver;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub resolver: IdentityResolver,
}

/// Resolve the bearer token into a [`PrincipalContext`] or answer 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let header = authorization_header(req.headers());

    let principal = state
        .resolver
        .resolve(header, Utc::now())
        .map_err(errors::domain_error_to_response)?;

    req.extensions_mut().insert(PrincipalContext::new(principal));

    Ok(next.run(req).await)
}

fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}
