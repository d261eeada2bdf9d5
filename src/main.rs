//! Editorial - multi-tenant content moderation server

use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use editorial::{
    api::{self, AppState},
    config::Config,
    db,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "editorial=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting editorial server...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(
        applied,
        total = db::migrations::total_migrations(),
        "Database migrations completed"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(pool, config);

    match state.identity.cleanup_expired_sessions().await {
        Ok(removed) => tracing::info!(removed, "Expired sessions cleaned up"),
        Err(e) => tracing::warn!(error = %e, "Failed to clean up expired sessions"),
    }

    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
