use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::config::LicenseConfig;
use crate::server::database::Database;
use crate::server::logging::HealthResponse;

/// Shared application state for handlers.
///
/// Holds the store handle; every handler borrows a pooled connection from it
/// per statement, so no connection state is shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub license: LicenseConfig,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            license: LicenseConfig::default(),
        }
    }

    pub fn with_license_config(mut self, license: LicenseConfig) -> Self {
        self.license = license;
        self
    }
}

/// Liveness and store connectivity.
///
/// `GET /health` answers 200 when the store responds, 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = state.db.ping().await;
    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthResponse::new(connected, state.db.db_type())))
}
