use anyhow::Context;

use accountd_api::app::build_app;
use accountd_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    accountd_observability::init(config.log_format);
    config.warn_insecure_defaults();
    tracing::debug!(?config, "configuration loaded");

    let app = build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
