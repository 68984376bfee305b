use anyhow::Context;
use server::{DeploymentImpl, routes};
use services::services::config::Config;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal in production.
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("loading configuration")?;
    utils::sentry::init_once(config.sentry_dsn.as_deref(), &config.environment);
    utils::logging::init(None);

    let addr = config.bind_addr();
    let deployment = DeploymentImpl::from_config(config)
        .await
        .context("initialising deployment")?;

    let app = routes::router(deployment);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!("Server running on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
