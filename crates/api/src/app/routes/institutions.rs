use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use accountd_core::ListParams;

use crate::app::dto::JsonBody;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_institutions).post(create_institution))
        .route(
            "/:id",
            get(get_institution).patch(update_institution).delete(delete_institution),
        )
}

pub async fn create_institution(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody,
) -> axum::response::Response {
    match services.orchestrator.create_institution(ctx.principal(), body).await {
        Ok(institution) => (StatusCode::CREATED, Json(institution.to_json())).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_institutions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(params): Query<ListParams>,
) -> axum::response::Response {
    match services.orchestrator.list_institutions(ctx.principal(), &params).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_institution(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> axum::response::Response {
    match services.orchestrator.get_institution(ctx.principal(), &id).await {
        Ok(institution) => (StatusCode::OK, Json(params.projection().project(institution.to_json()))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_institution(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> axum::response::Response {
    match services.orchestrator.update_institution(ctx.principal(), &id, body).await {
        Ok(institution) => (StatusCode::OK, Json(institution.to_json())).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_institution(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match services.orchestrator.delete_institution(ctx.principal(), &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
