//! Client API endpoint used by the bot integration.
//!
//! # Endpoints
//!
//! - `POST /validate_key` - Validate a key, binding it to the server on first use
//! - `POST /api/v1/client/validate` - Same handler under the versioned prefix

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::api_error::ApiError;
use crate::server::binding::{validate_and_bind, BindOutcome};
use crate::server::handlers::AppState;
use crate::server::validation::validate_present;

/// Request to validate a key for a server.
///
/// Both fields are optional at the serde level so that a missing field is
/// reported as `BAD_REQUEST` in the usual error shape.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateKeyRequest {
    /// The license key token
    #[serde(default)]
    pub key: Option<String>,
    /// Identifier of the server presenting the key
    #[serde(default)]
    pub server_id: Option<String>,
}

/// Response from a successful validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateKeyResponse {
    /// Always `"success"`
    pub status: String,
    pub message: String,
    /// `validated-and-bound` or `revalidated`
    pub outcome: String,
}

impl From<BindOutcome> for ValidateKeyResponse {
    fn from(outcome: BindOutcome) -> Self {
        Self {
            status: "success".to_string(),
            message: outcome.message().to_string(),
            outcome: outcome.as_str().to_string(),
        }
    }
}

/// Validate a key, binding it on first use.
///
/// # Behavior
/// - Missing or blank `key`/`server_id` → 400
/// - Unknown, deactivated, or foreign-bound key → 403
/// - Unbound key → bound to `server_id`, 200 `validated-and-bound`
/// - Key bound to `server_id` → 200 `revalidated`
pub async fn validate_key_handler(
    State(state): State<AppState>,
    payload: Result<Json<ValidateKeyRequest>, JsonRejection>,
) -> Result<Json<ValidateKeyResponse>, ApiError> {
    let Json(req) = payload?;

    let key = validate_present(req.key.as_deref(), "key")?;
    let server_id = validate_present(req.server_id.as_deref(), "server_id")?;

    info!("Validate request for server_id={}", server_id);

    let outcome = validate_and_bind(&state.db, key, server_id).await?;

    Ok(Json(outcome.into()))
}
