//! `/users/{educators|healthprofessionals}/:id/children/groups[/:group_id]`

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use accountd_core::ListParams;

use crate::app::dto::JsonBody;
use crate::app::errors;
use crate::app::routes::users::RoleScope;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Mounted inside an owner role's router; `:id` is the owner.
pub fn router() -> Router {
    Router::new()
        .route("/:id/children/groups", post(create_group).get(list_groups))
        .route(
            "/:id/children/groups/:group_id",
            get(get_group).patch(update_group).delete(delete_group),
        )
}

pub async fn create_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Extension(RoleScope(owner_role)): Extension<RoleScope>,
    Path(owner_id): Path<String>,
    JsonBody(body): JsonBody,
) -> axum::response::Response {
    match services
        .orchestrator
        .create_group(ctx.principal(), owner_role, &owner_id, body)
        .await
    {
        Ok(group) => (StatusCode::CREATED, Json(group.to_json())).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_groups(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(owner_id): Path<String>,
    Query(params): Query<ListParams>,
) -> axum::response::Response {
    match services.orchestrator.list_groups(ctx.principal(), &owner_id, &params).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((owner_id, group_id)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> axum::response::Response {
    match services.orchestrator.get_group(ctx.principal(), &owner_id, &group_id).await {
        Ok(group) => (StatusCode::OK, Json(params.projection().project(group.to_json()))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((owner_id, group_id)): Path<(String, String)>,
    JsonBody(body): JsonBody,
) -> axum::response::Response {
    match services
        .orchestrator
        .update_group(ctx.principal(), &owner_id, &group_id, body)
        .await
    {
        Ok(group) => (StatusCode::OK, Json(group.to_json())).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((owner_id, group_id)): Path<(String, String)>,
) -> axum::response::Response {
    match services
        .orchestrator
        .delete_group(ctx.principal(), &owner_id, &group_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
