use anyhow::Context;
use tracing_subscriber::EnvFilter;

use vexel_web_service::build_router;
use vexel_web_service::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_filter.clone()))
        .init();

    let bind_addr = config.bind_addr;
    let app = build_router(config).context("failed to build the application router")?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "vexel web service listening");

    axum::serve(listener, app)
        .await
        .context("server terminated")?;

    Ok(())
}
