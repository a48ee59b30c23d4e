//! Service wiring: repository, hasher, token issuer, orchestrator.

use std::sync::Arc;

use accountd_auth::{Argon2PasswordHasher, Hs256Jwt};
use accountd_infra::{InMemoryRepository, Orchestrator};

use crate::app::StartupError;
use crate::config::AppConfig;

pub struct AppServices {
    pub orchestrator: Orchestrator,
}

/// Build the services and seed the bootstrap admin.
pub async fn build_services(config: &AppConfig, jwt: Arc<Hs256Jwt>) -> Result<AppServices, StartupError> {
    let hasher = Argon2PasswordHasher::new(config.argon2_memory_kib)?;
    let repo = Arc::new(InMemoryRepository::new());
    let orchestrator = Orchestrator::new(repo, Arc::new(hasher), jwt);

    if orchestrator
        .ensure_admin(&config.admin_username, &config.admin_password)
        .await?
    {
        tracing::info!(username = %config.admin_username, "seeded bootstrap admin");
    }

    Ok(AppServices { orchestrator })
}
