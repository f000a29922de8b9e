//! Key store: the persistent `license_keys` table and every statement that
//! touches it.
//!
//! Each method borrows a pooled connection for the duration of one statement.
//! The only path that writes `bound_server_id` is [`Database::bind_server`],
//! a single conditional `UPDATE` that succeeds at most once per key.

use chrono::{NaiveDateTime, Utc};
use sqlx::{query, query_as, FromRow};
use std::sync::Arc;
use tracing::{error, warn};

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
#[cfg(feature = "sqlite")]
use std::str::FromStr;

#[cfg(feature = "postgres")]
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::{get_config, DatabaseConfig};
use crate::errors::{LicenseError, LicenseResult};
use crate::license_key::generate_license_key;

/// One issued license key, as stored in `license_keys`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LicenseKey {
    pub id: i64,
    pub key: String,
    pub client_name: String,
    pub bound_server_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub is_active: bool,
}

impl LicenseKey {
    pub fn is_bound(&self) -> bool {
        self.bound_server_id.is_some()
    }
}

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

fn store_error(op: &'static str) -> impl FnOnce(sqlx::Error) -> LicenseError {
    move |e| {
        error!("{op} failed: {e}");
        LicenseError::Unavailable(format!("database error: {e}"))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

impl Database {
    /// Initialize the database using the global configuration.
    pub async fn new() -> LicenseResult<Arc<Self>> {
        let config = get_config()?;
        Self::connect(&config.database).await
    }

    /// Open a connection pool for the configured backend.
    pub async fn connect(db_config: &DatabaseConfig) -> LicenseResult<Arc<Self>> {
        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let options = SqliteConnectOptions::from_str(&db_config.sqlite_url)
                    .map_err(|e| {
                        LicenseError::ConfigError(format!("invalid SQLite URL: {e}"))
                    })?
                    .create_if_missing(true)
                    .synchronous(SqliteSynchronous::Full);

                let pool = SqlitePoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        LicenseError::Unavailable(format!("failed to connect to SQLite: {e}"))
                    })?;

                Ok(Arc::new(Database::SQLite(pool)))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(LicenseError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .connect(&db_config.postgres_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        LicenseError::Unavailable(format!(
                            "failed to connect to PostgreSQL: {e}"
                        ))
                    })?;

                Ok(Arc::new(Database::Postgres(pool)))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(LicenseError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(LicenseError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Backend name, as reported by the health endpoint.
    pub fn db_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Create the `license_keys` table if it does not exist yet.
    pub async fn migrate(&self) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(
                    r#"
                    CREATE TABLE IF NOT EXISTS license_keys (
                        id              INTEGER PRIMARY KEY AUTOINCREMENT,
                        key             TEXT NOT NULL UNIQUE,
                        client_name     TEXT NOT NULL,
                        bound_server_id TEXT,
                        created_at      TEXT NOT NULL,
                        is_active       INTEGER NOT NULL DEFAULT 1
                    )
                    "#,
                )
                .execute(pool)
                .await
                .map_err(store_error("SQLite migrate"))?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    r#"
                    CREATE TABLE IF NOT EXISTS license_keys (
                        id              BIGSERIAL PRIMARY KEY,
                        key             TEXT NOT NULL UNIQUE,
                        client_name     TEXT NOT NULL,
                        bound_server_id TEXT,
                        created_at      TIMESTAMP NOT NULL,
                        is_active       BOOLEAN NOT NULL DEFAULT TRUE
                    )
                    "#,
                )
                .execute(pool)
                .await
                .map_err(store_error("Postgres migrate"))?;
            }
        }

        Ok(())
    }

    /// Close the pool. Later operations fail with `Unavailable`.
    pub async fn close(&self) {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => pool.close().await,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => pool.close().await,
        }
    }

    /// Returns `true` when the store answers a trivial query.
    pub async fn ping(&self) -> bool {
        let result = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("SELECT 1").execute(pool).await.map(|_| ()),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("SELECT 1").execute(pool).await.map(|_| ()),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Database ping failed: {e}");
                false
            }
        }
    }

    /// Issue a new key: active, unbound, with a fresh token.
    ///
    /// A token collision is retried with a new token up to `attempts` times.
    pub async fn create_key(&self, client_name: &str, attempts: u32) -> LicenseResult<LicenseKey> {
        for _ in 0..attempts {
            let token = generate_license_key();
            let now = Utc::now().naive_utc();

            match self.insert_key(&token, client_name, now).await {
                Ok(record) => return Ok(record),
                Err(e) if is_unique_violation(&e) => {
                    warn!("License key collision on insert, retrying with a fresh token");
                }
                Err(e) => return Err(store_error("create_key")(e)),
            }
        }

        Err(LicenseError::ServerError(format!(
            "failed to generate unique license key after {attempts} attempts"
        )))
    }

    async fn insert_key(
        &self,
        token: &str,
        client_name: &str,
        created_at: NaiveDateTime,
    ) -> Result<LicenseKey, sqlx::Error> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query_as::<_, LicenseKey>(
                    r#"
                    INSERT INTO license_keys (key, client_name, created_at, is_active)
                    VALUES (?, ?, ?, 1)
                    RETURNING id, key, client_name, bound_server_id, created_at, is_active
                    "#,
                )
                .bind(token)
                .bind(client_name)
                .bind(created_at)
                .fetch_one(pool)
                .await
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query_as::<_, LicenseKey>(
                    r#"
                    INSERT INTO license_keys (key, client_name, created_at, is_active)
                    VALUES ($1, $2, $3, TRUE)
                    RETURNING id, key, client_name, bound_server_id, created_at, is_active
                    "#,
                )
                .bind(token)
                .bind(client_name)
                .bind(created_at)
                .fetch_one(pool)
                .await
            }
        }
    }

    /// Fetch a key by its numeric id.
    pub async fn get_key(&self, id: i64) -> LicenseResult<Option<LicenseKey>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, LicenseKey>(
                "SELECT id, key, client_name, bound_server_id, created_at, is_active \
                 FROM license_keys WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(store_error("SQLite get_key")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, LicenseKey>(
                "SELECT id, key, client_name, bound_server_id, created_at, is_active \
                 FROM license_keys WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(store_error("Postgres get_key")),
        }
    }

    /// Fetch a key by its token.
    pub async fn get_key_by_token(&self, key: &str) -> LicenseResult<Option<LicenseKey>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, LicenseKey>(
                "SELECT id, key, client_name, bound_server_id, created_at, is_active \
                 FROM license_keys WHERE key = ?",
            )
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(store_error("SQLite get_key_by_token")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, LicenseKey>(
                "SELECT id, key, client_name, bound_server_id, created_at, is_active \
                 FROM license_keys WHERE key = $1",
            )
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(store_error("Postgres get_key_by_token")),
        }
    }

    /// All keys, newest first.
    pub async fn list_keys(&self) -> LicenseResult<Vec<LicenseKey>> {
        const SQL: &str = "SELECT id, key, client_name, bound_server_id, created_at, is_active \
                           FROM license_keys ORDER BY id DESC";

        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, LicenseKey>(SQL)
                .fetch_all(pool)
                .await
                .map_err(store_error("SQLite list_keys")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, LicenseKey>(SQL)
                .fetch_all(pool)
                .await
                .map_err(store_error("Postgres list_keys")),
        }
    }

    /// Claim an unbound, active key for `server_id`.
    ///
    /// Returns:
    /// - `Ok(true)` if this call performed the bind
    /// - `Ok(false)` if the key is unknown, inactive, or already bound
    ///
    /// The check and the write are one statement, so two callers can never
    /// both observe `bound_server_id IS NULL` and both write.
    pub async fn bind_server(&self, key: &str, server_id: &str) -> LicenseResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE license_keys \
                     SET bound_server_id = ? \
                     WHERE key = ? AND bound_server_id IS NULL AND is_active = 1",
            )
            .bind(server_id)
            .bind(key)
            .execute(pool)
            .await
            .map_err(store_error("SQLite bind_server"))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE license_keys \
                     SET bound_server_id = $1 \
                     WHERE key = $2 AND bound_server_id IS NULL AND is_active = TRUE",
            )
            .bind(server_id)
            .bind(key)
            .execute(pool)
            .await
            .map_err(store_error("Postgres bind_server"))?
            .rows_affected(),
        };

        Ok(rows_affected == 1)
    }

    /// Flip `is_active` and return the updated record. Binding is untouched.
    pub async fn toggle_active(&self, id: i64) -> LicenseResult<LicenseKey> {
        let updated = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, LicenseKey>(
                r#"
                UPDATE license_keys
                SET is_active = CASE WHEN is_active = 1 THEN 0 ELSE 1 END
                WHERE id = ?
                RETURNING id, key, client_name, bound_server_id, created_at, is_active
                "#,
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(store_error("SQLite toggle_active"))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, LicenseKey>(
                r#"
                UPDATE license_keys
                SET is_active = NOT is_active
                WHERE id = $1
                RETURNING id, key, client_name, bound_server_id, created_at, is_active
                "#,
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(store_error("Postgres toggle_active"))?,
        };

        updated.ok_or_else(|| LicenseError::NotFound(format!("license key {id}")))
    }

    /// Remove an inactive key.
    ///
    /// Fails with `Conflict` while the key is active and `NotFound` if no such
    /// id exists. The activity check is part of the `DELETE` itself.
    pub async fn delete_key(&self, id: i64) -> LicenseResult<()> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query("DELETE FROM license_keys WHERE id = ? AND is_active = 0")
                    .bind(id)
                    .execute(pool)
                    .await
                    .map_err(store_error("SQLite delete_key"))?
                    .rows_affected()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query("DELETE FROM license_keys WHERE id = $1 AND is_active = FALSE")
                    .bind(id)
                    .execute(pool)
                    .await
                    .map_err(store_error("Postgres delete_key"))?
                    .rows_affected()
            }
        };

        if rows_affected > 0 {
            return Ok(());
        }

        match self.get_key(id).await? {
            Some(_) => Err(LicenseError::Conflict(
                "active license keys cannot be deleted; deactivate it first".to_string(),
            )),
            None => Err(LicenseError::NotFound(format!("license key {id}"))),
        }
    }
}
