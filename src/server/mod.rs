// src/server/mod.rs

//! Server-side components for guildkey.
//!
//! This module contains:
//! - `database`    → key store over SQLite/Postgres
//! - `binding`     → validation service (bind on first use, revalidate after)
//! - `client_api`  → HTTP endpoint used by the bot integration
//! - `admin`       → admin API for key CRUD (requires `admin-api` feature)
//! - `api_error`   → error body and status mapping shared by all endpoints
//! - `handlers`    → shared state and health endpoint
//! - `logging`     → tracing setup, request middleware, key events
//! - `routes`      → router builder
//! - `validation`  → request validation utilities

pub mod api_error;
pub mod binding;
pub mod client_api;
pub mod database;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod validation;

#[cfg(feature = "admin-api")]
pub mod admin;

pub use api_error::{ApiError, ErrorCode};
pub use binding::{validate_and_bind, BindOutcome};
pub use client_api::{validate_key_handler, ValidateKeyRequest, ValidateKeyResponse};
pub use database::{Database, LicenseKey};
pub use handlers::{health_handler, AppState};
pub use logging::{init_tracing, log_key_event, request_logging_middleware, KeyEvent};
pub use routes::build_router;

#[cfg(feature = "admin-api")]
pub use admin::{
    create_key_handler, delete_key_handler, get_key_handler, list_keys_handler,
    toggle_key_handler, CreateKeyRequest, DeleteKeyResponse, KeyResponse, ListKeysResponse,
};
