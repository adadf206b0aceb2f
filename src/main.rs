use anyhow::Context;
use tracing_subscriber::EnvFilter;

use zolaris_api_rust::app::{app, AppState};
use zolaris_api_rust::config;
use zolaris_api_rust::database::{schema, DatabaseManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting Zolaris API in {:?} mode", config.environment);

    let pool = DatabaseManager::main_pool()
        .await
        .context("failed to connect to the database")?;
    if config.database.apply_schema_on_start {
        schema::apply(&pool).await.context("failed to apply schema")?;
    }

    let app = app(AppState::from_pool(pool));

    // Allow tests or deployments to override port via env
    let port = std::env::var("ZOLARIS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Zolaris API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    DatabaseManager::close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
