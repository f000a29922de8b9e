use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::client_api::validate_key_handler;
use crate::server::handlers::{health_handler, AppState};
use crate::server::logging::request_logging_middleware;

#[cfg(feature = "admin-api")]
use crate::server::admin::{
    create_key_handler, delete_key_handler, get_key_handler, list_keys_handler,
    toggle_key_handler,
};

/// Build the main application router for the guildkey server.
///
/// # Routes
///
/// ## Bot endpoints
/// - `POST /validate_key` - Validate a key and bind it on first use
/// - `POST /api/v1/client/validate` - Same, under the versioned prefix
/// - `GET /health` - Liveness and store connectivity
///
/// ## Admin endpoints (requires `admin-api` feature)
/// - `POST /api/v1/keys` - Issue a key
/// - `GET /api/v1/keys` - List keys, newest first
/// - `GET /api/v1/keys/:id` - Get a key
/// - `POST /api/v1/keys/:id/toggle` - Deactivate or reactivate a key
/// - `DELETE /api/v1/keys/:id` - Delete an inactive key
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/validate_key", post(validate_key_handler))
        .route("/api/v1/client/validate", post(validate_key_handler));

    #[cfg(feature = "admin-api")]
    let router = router
        .route("/api/v1/keys", post(create_key_handler).get(list_keys_handler))
        .route(
            "/api/v1/keys/:id",
            get(get_key_handler).delete(delete_key_handler),
        )
        .route("/api/v1/keys/:id/toggle", post(toggle_key_handler));

    router
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state)
}
