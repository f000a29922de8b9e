//! guildkey - license keys for bot integrations, bound to one server on first use.
//!
//! # Features
//!
//! - `server` - Key store, validation service and HTTP server. Enabled by default.
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `admin-api` - Admin routes for issuing, listing, toggling and deleting keys.
//!   Enabled by default.
//!
//! # Example
//!
//! ```toml
//! # Use defaults (server + sqlite + admin-api)
//! guildkey = { path = "." }
//!
//! # Server with PostgreSQL
//! guildkey = { path = ".", features = ["server", "postgres"] }
//! ```

#[cfg(all(feature = "server", not(any(feature = "sqlite", feature = "postgres"))))]
compile_error!("the `server` feature needs a database backend: enable `sqlite` or `postgres`");

// Core modules (always available)
pub mod config;
pub mod errors;
pub mod license_key;

// Server-related modules (requires "server" feature)
#[cfg(feature = "server")]
#[path = "server/mod.rs"]
pub mod server;
