//! Warden API server
//!
//! REST server for credential sign-in and role-scoped account management.

use std::sync::Arc;

use warden_api::store::PgUserStore;
use warden_api::{create_router, state::AppState};
use warden_core::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("warden_api={},tower_http=info", config.logging.level).into()
            }),
        )
        .init();

    // Connect storage and apply pending migrations
    let store = PgUserStore::connect(&config.database.url, config.database.pool_size).await?;
    sqlx::migrate!("./migrations").run(store.pool()).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state and router
    let state = Arc::new(AppState::new(config, Arc::new(store)));
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Warden API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
