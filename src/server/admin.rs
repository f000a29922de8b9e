//! Admin API handlers for license key management.
//!
//! There is no authentication on these routes. Deployments should keep them
//! on a private interface or put them behind an authenticating proxy.
//!
//! # Endpoints
//!
//! - `POST /api/v1/keys` - Issue a new key for a client
//! - `GET /api/v1/keys` - List all keys, newest first
//! - `GET /api/v1/keys/:id` - Get a key by id
//! - `POST /api/v1/keys/:id/toggle` - Deactivate or reactivate a key
//! - `DELETE /api/v1/keys/:id` - Delete an inactive key

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::LicenseError;
use crate::license_key::{normalize_client_name, MAX_CLIENT_NAME_LEN};
use crate::server::api_error::ApiError;
use crate::server::database::LicenseKey;
use crate::server::handlers::AppState;
use crate::server::logging::{log_key_event, KeyEvent};
use crate::server::validation::validate_max_length;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for issuing a new key.
#[derive(Debug, Default, Deserialize)]
pub struct CreateKeyRequest {
    /// Free-text label; defaults to `Unnamed` when missing or blank
    #[serde(default)]
    pub client_name: Option<String>,
}

/// Response for a single key.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyResponse {
    pub id: i64,
    pub key: String,
    pub client_name: String,
    pub bound_server_id: Option<String>,
    pub is_bound: bool,
    pub created_at: String,
    pub is_active: bool,
}

impl From<LicenseKey> for KeyResponse {
    fn from(record: LicenseKey) -> Self {
        let is_bound = record.is_bound();
        Self {
            id: record.id,
            key: record.key,
            client_name: record.client_name,
            bound_server_id: record.bound_server_id,
            is_bound,
            created_at: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            is_active: record.is_active,
        }
    }
}

/// Response for listing keys.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListKeysResponse {
    pub keys: Vec<KeyResponse>,
    pub total: usize,
}

/// Response for a deletion.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteKeyResponse {
    pub status: String,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Issue a new key.
///
/// `POST /api/v1/keys`
///
/// An empty body is accepted and yields an `Unnamed` key.
pub async fn create_key_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateKeyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<KeyResponse>), ApiError> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => CreateKeyRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };

    let client_name = normalize_client_name(req.client_name.as_deref());
    validate_max_length(&client_name, MAX_CLIENT_NAME_LEN, "client_name")?;

    let record = state
        .db
        .create_key(&client_name, state.license.key_attempts)
        .await?;

    log_key_event(KeyEvent::Created, &record.id.to_string(), Some(&client_name));

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// List every key, newest first.
///
/// `GET /api/v1/keys`
pub async fn list_keys_handler(
    State(state): State<AppState>,
) -> Result<Json<ListKeysResponse>, ApiError> {
    let keys: Vec<KeyResponse> = state
        .db
        .list_keys()
        .await?
        .into_iter()
        .map(KeyResponse::from)
        .collect();

    info!("Listing {} license keys", keys.len());

    Ok(Json(ListKeysResponse {
        total: keys.len(),
        keys,
    }))
}

/// Get a key by id.
///
/// `GET /api/v1/keys/:id`
pub async fn get_key_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<KeyResponse>, ApiError> {
    let record = state
        .db
        .get_key(id)
        .await?
        .ok_or_else(|| LicenseError::NotFound(format!("license key {id}")))?;

    Ok(Json(record.into()))
}

/// Flip a key between active and inactive. Its binding is left alone.
///
/// `POST /api/v1/keys/:id/toggle`
pub async fn toggle_key_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<KeyResponse>, ApiError> {
    let record = state.db.toggle_active(id).await?;

    let event = if record.is_active {
        KeyEvent::Activated
    } else {
        KeyEvent::Deactivated
    };
    log_key_event(event, &id.to_string(), None);

    Ok(Json(record.into()))
}

/// Delete an inactive key.
///
/// `DELETE /api/v1/keys/:id`
///
/// Active keys are refused with 409.
pub async fn delete_key_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteKeyResponse>, ApiError> {
    state.db.delete_key(id).await?;

    log_key_event(KeyEvent::Deleted, &id.to_string(), None);

    Ok(Json(DeleteKeyResponse {
        status: "success".to_string(),
        message: format!("license key {id} deleted"),
    }))
}
