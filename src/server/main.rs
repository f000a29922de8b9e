// src/server/main.rs

use std::sync::Arc;

use guildkey::config::get_config;
use guildkey::errors::{LicenseError, LicenseResult};
use guildkey::server::{build_router, init_tracing, AppState, Database};
use tracing::info;

#[tokio::main]
async fn main() -> LicenseResult<()> {
    let config = get_config()?;
    init_tracing(&config.logging)?;

    let db: Arc<Database> = Database::new().await?;
    db.migrate().await?;
    info!("License store ready (backend={})", db.db_type());

    let state = AppState::new(Arc::clone(&db)).with_license_config(config.license.clone());
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LicenseError::ServerError(format!("failed to bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LicenseError::ServerError(format!("server error: {e}")))?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
