//! Validation service: the bind/validate decision for a presented key.
//!
//! Outcomes, in order of precedence:
//! - unknown key → [`LicenseError::InvalidKey`]
//! - deactivated key → [`LicenseError::KeyDeactivated`]
//! - unbound key → bind to the caller, [`BindOutcome::Bound`]
//! - bound to the caller → [`BindOutcome::Revalidated`]
//! - bound elsewhere → [`LicenseError::ServerMismatch`]
//!
//! The first-bind write goes through [`Database::bind_server`], a conditional
//! update. When that update loses a race, the record is read again and judged
//! against its new state, up to a few rounds.

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{LicenseError, LicenseResult};
use crate::license_key::redact_token;
use crate::server::database::{Database, LicenseKey};
use crate::server::logging::{log_key_event, KeyEvent};
use crate::server::validation::validate_not_empty;

/// Successful result of [`validate_and_bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindOutcome {
    /// This call performed the first bind.
    #[serde(rename = "validated-and-bound")]
    Bound,
    /// The key was already bound to the caller; nothing changed.
    Revalidated,
}

impl BindOutcome {
    /// Stable machine token for the outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            BindOutcome::Bound => "validated-and-bound",
            BindOutcome::Revalidated => "revalidated",
        }
    }

    /// Human-readable message returned to the bot.
    pub fn message(&self) -> &'static str {
        match self {
            BindOutcome::Bound => "Key validated and bound to this server.",
            BindOutcome::Revalidated => "Key re-validated for this server.",
        }
    }
}

impl std::fmt::Display for BindOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-evaluate-bind rounds before giving up on a key whose state keeps
/// changing underneath us.
const BIND_ATTEMPTS: usize = 3;

/// What the current state of a record allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    NeedsBind,
    Revalidated,
}

/// Judge a record against the calling server without touching the store.
fn evaluate(record: Option<&LicenseKey>, server_id: &str) -> LicenseResult<Verdict> {
    let record = record.ok_or(LicenseError::InvalidKey)?;

    if !record.is_active {
        return Err(LicenseError::KeyDeactivated);
    }

    match record.bound_server_id.as_deref() {
        None => Ok(Verdict::NeedsBind),
        Some(bound) if bound == server_id => Ok(Verdict::Revalidated),
        Some(_) => Err(LicenseError::ServerMismatch),
    }
}

/// Validate `key` for `server_id`, binding it on first use.
///
/// Both inputs must be non-blank, otherwise `BadRequest`. The bind is durable
/// once this returns `Ok(BindOutcome::Bound)`.
pub async fn validate_and_bind(
    db: &Database,
    key: &str,
    server_id: &str,
) -> LicenseResult<BindOutcome> {
    validate_not_empty(key, "key")?;
    validate_not_empty(server_id, "server_id")?;

    let result = run(db, key, server_id).await;

    let key_ref = redact_token(key);
    match &result {
        Ok(BindOutcome::Bound) => log_key_event(KeyEvent::Bound, &key_ref, Some(server_id)),
        Ok(BindOutcome::Revalidated) => {
            log_key_event(KeyEvent::Revalidated, &key_ref, Some(server_id))
        }
        Err(LicenseError::Unavailable(_)) => {}
        Err(e) => log_key_event(KeyEvent::Rejected, &key_ref, Some(&e.to_string())),
    }

    result
}

async fn run(db: &Database, key: &str, server_id: &str) -> LicenseResult<BindOutcome> {
    for _ in 0..BIND_ATTEMPTS {
        let record = db.get_key_by_token(key).await?;

        match evaluate(record.as_ref(), server_id)? {
            Verdict::Revalidated => return Ok(BindOutcome::Revalidated),
            Verdict::NeedsBind => {
                if db.bind_server(key, server_id).await? {
                    return Ok(BindOutcome::Bound);
                }
            }
        }

        // The conditional update matched nothing: between our read and write
        // the key was bound, deactivated or deleted. The next read judges the
        // state we lost to; a key flipped off and on again is simply retried.
        debug!("Bind lost a race, re-reading key state");
    }

    warn!("Key state kept changing during bind, giving up after {BIND_ATTEMPTS} attempts");
    Err(LicenseError::Unavailable(
        "key state changed concurrently, retry the request".to_string(),
    ))
}
