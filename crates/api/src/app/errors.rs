use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use accountd_core::DomainError;

/// HTTP status for each domain error kind.
pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = status_for(&err);
    if let DomainError::Store(detail) = &err {
        tracing::error!(%detail, "store failure");
    }
    json_error(status, err.code(), err.message(), err.description())
}

/// Error body: `{ code, error, message, description }`.
pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    description: Option<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "code": status.as_u16(),
            "error": code,
            "message": message.into(),
            "description": description,
        })),
    )
        .into_response()
}
