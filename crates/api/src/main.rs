use std::sync::Arc;

use anyhow::Context;

use bloodline_api::{app, config::AppConfig, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bloodline_observability::init();

    let config = AppConfig::from_env();
    let services = Arc::new(app::AppServices::build(config.clone()).context("invalid service configuration")?);
    seed::seed_demo(&services).context("failed to seed demo data")?;

    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
