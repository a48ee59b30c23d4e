use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use accountd_auth::Role;
use accountd_core::ListParams;

use crate::app::dto::JsonBody;
use crate::app::errors;
use crate::app::routes::groups;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Account role served by a `/users/{role-plural}` subtree.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RoleScope(pub Role);

/// Routes for one account role. Group owners also get their
/// `/:id/children/groups` subtree.
pub fn router(role: Role) -> Router {
    let mut router = Router::new()
        .route("/", post(create_account).get(list_accounts))
        .route("/:id", get(get_account).patch(update_account));

    if role.can_own_groups() {
        router = router.merge(groups::router());
    }

    router.layer(Extension(RoleScope(role)))
}

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Extension(RoleScope(role)): Extension<RoleScope>,
    JsonBody(body): JsonBody,
) -> axum::response::Response {
    match services.orchestrator.create_account(ctx.principal(), role, body).await {
        Ok(view) => (StatusCode::CREATED, Json(view.to_json())).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Extension(RoleScope(role)): Extension<RoleScope>,
    Query(params): Query<ListParams>,
) -> axum::response::Response {
    match services.orchestrator.list_accounts(ctx.principal(), role, &params).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Extension(RoleScope(role)): Extension<RoleScope>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> axum::response::Response {
    match services.orchestrator.get_account(ctx.principal(), role, &id).await {
        Ok(view) => (StatusCode::OK, Json(params.projection().project(view.to_json()))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Extension(RoleScope(role)): Extension<RoleScope>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> axum::response::Response {
    match services.orchestrator.update_account(ctx.principal(), role, &id, body).await {
        Ok(view) => (StatusCode::OK, Json(view.to_json())).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// `DELETE /users/:id` for every role.
pub async fn delete_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match services.orchestrator.delete_account(ctx.principal(), &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// `PATCH /users/:id/password`.
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> axum::response::Response {
    match services.orchestrator.change_password(ctx.principal(), &id, body).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
