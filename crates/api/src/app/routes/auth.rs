use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;

use crate::app::dto::JsonBody;
use crate::app::errors;
use crate::app::services::AppServices;

/// `POST /auth`: exchange `{username, password}` for `{access_token}`.
pub async fn authenticate(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody,
) -> axum::response::Response {
    match services.orchestrator.login(body, Utc::now()).await {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
