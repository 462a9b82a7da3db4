use anyhow::Context;

use stockroom_api::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    stockroom_observability::init_with(config.log_format);

    let app = stockroom_api::app::build_app(&config)
        .await
        .context("failed to build application")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        database_url = %config.database_url,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
