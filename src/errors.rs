//! Error types shared by the key store, the validation service and the
//! HTTP layer.

use thiserror::Error;

/// Every failure a guildkey operation can report.
///
/// The first six variants are the validation/admin taxonomy seen by callers.
/// The rest are process-level conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LicenseError {
    /// Malformed input: a missing or empty field, an unparseable body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No key record matches the presented token.
    #[error("invalid license key")]
    InvalidKey,

    /// The key exists but has been disabled by an administrator.
    #[error("this license key has been deactivated")]
    KeyDeactivated,

    /// The key is already bound to a different server.
    #[error("this license key is already in use on another server")]
    ServerMismatch,

    /// An administrative operation violates a precondition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store could not be reached or the statement failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Administrative lookup by id found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("server error: {0}")]
    ServerError(String),
}

pub type LicenseResult<T> = Result<T, LicenseError>;
