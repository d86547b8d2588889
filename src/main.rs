//! Payment endpoint service - application entry point.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Pick the processor client
//! 5. Build HTTP router and start serving

use std::sync::Arc;

use payment_endpoint::{
    AppState, build_router, config, db, processor_from_config, store::PgPaymentStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG, defaults to "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(base_url = %config.base_url, "Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let processor = processor_from_config(&config)?;
    tracing::info!(processor = processor.name(), "Payment processor configured");

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState::new(config, Arc::new(PgPaymentStore::new(pool)), processor);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
