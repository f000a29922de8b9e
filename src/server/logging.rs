//! Logging for the guildkey server.
//!
//! This module provides:
//! - subscriber setup driven by [`LoggingConfig`]
//! - request logging middleware with a per-request id
//! - structured key lifecycle events
//! - the health check payload
//!
//! # Usage
//!
//! ```rust,ignore
//! use axum::middleware;
//! use guildkey::server::logging::request_logging_middleware;
//!
//! let app = Router::new()
//!     .route("/health", get(health_handler))
//!     .layer(middleware::from_fn(request_logging_middleware));
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::errors::{LicenseError, LicenseResult};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level` when set.
pub fn init_tracing(config: &LoggingConfig) -> LicenseResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_lowercase()))
        .map_err(|e| LicenseError::ConfigError(format!("invalid log filter: {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| LicenseError::ConfigError(format!("failed to install subscriber: {e}")))
}

/// License key lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Key was issued
    Created,
    /// Key was bound to a server on first validation
    Bound,
    /// Key was validated again by its bound server
    Revalidated,
    /// Validation was refused
    Rejected,
    /// Key was reactivated by an administrator
    Activated,
    /// Key was deactivated by an administrator
    Deactivated,
    /// Key was deleted
    Deleted,
}

impl std::fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            KeyEvent::Created => "created",
            KeyEvent::Bound => "bound",
            KeyEvent::Revalidated => "revalidated",
            KeyEvent::Rejected => "rejected",
            KeyEvent::Activated => "activated",
            KeyEvent::Deactivated => "deactivated",
            KeyEvent::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}

/// Log a key lifecycle event.
///
/// # Arguments
///
/// * `event` - The type of key event
/// * `key` - Key id or redacted token (see [`crate::license_key::redact_token`])
/// * `details` - Optional additional details (server id, rejection reason)
pub fn log_key_event(event: KeyEvent, key: &str, details: Option<&str>) {
    let span = info_span!(
        "key_event",
        event = %event,
        key = %key,
    );
    let _enter = span.enter();

    match event {
        KeyEvent::Rejected => {
            if let Some(d) = details {
                warn!(reason = %d, "Key event occurred");
            } else {
                warn!("Key event occurred");
            }
        }
        _ => {
            if let Some(d) = details {
                info!(details = %d, "Key event occurred");
            } else {
                info!("Key event occurred");
            }
        }
    }
}

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Generate a new unique request ID.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logging middleware that tracks request timing and generates request IDs.
///
/// An incoming `X-Request-Id` is reused; otherwise a fresh one is generated.
/// Each request runs inside a span carrying its id, method and path. The
/// completion line records status and duration, and the id is echoed back in
/// the `X-Request-Id` response header.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();

    let response = async move {
        info!("Started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();

    let _enter = span.enter();
    info!(
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    Response::from_parts(parts, body)
}

/// Health check response structure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status ("healthy" or "degraded")
    pub status: String,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Database connectivity status
    pub database: DatabaseHealth,
}

/// Database health status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseHealth {
    /// Whether the database answered
    pub connected: bool,
    /// Database type (sqlite or postgres)
    pub db_type: String,
}

impl HealthResponse {
    pub fn new(db_connected: bool, db_type: &str) -> Self {
        Self {
            status: if db_connected { "healthy" } else { "degraded" }.to_string(),
            service: "guildkey".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_connected,
                db_type: db_type.to_string(),
            },
        }
    }
}
