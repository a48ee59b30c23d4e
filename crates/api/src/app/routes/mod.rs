use axum::{
    routing::{delete, patch},
    Router,
};

use accountd_auth::Role;

pub mod auth;
pub mod groups;
pub mod institutions;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/institutions", institutions::router())
        .route("/users/:id", delete(users::delete_account))
        .route("/users/:id/password", patch(users::change_password))
        .nest("/users/admins", users::router(Role::Admin))
        .nest("/users/children", users::router(Role::Child))
        .nest("/users/educators", users::router(Role::Educator))
        .nest("/users/healthprofessionals", users::router(Role::HealthProfessional))
        .nest("/users/families", users::router(Role::Family))
        .nest("/users/applications", users::router(Role::Application))
}
