//! License key token generation.
//!
//! Tokens are random UUID v4 strings. They are opaque bearer tokens: nothing
//! is derived from them and nothing about the holder is encoded in them.

use uuid::Uuid;

/// Maximum length accepted for a client label.
pub const MAX_CLIENT_NAME_LEN: usize = 200;

/// Label used when a key is created without a client name.
pub const DEFAULT_CLIENT_NAME: &str = "Unnamed";

/// Generate a fresh, unguessable key token.
///
/// # Example
///
/// ```
/// use guildkey::license_key::generate_license_key;
///
/// let key = generate_license_key();
/// assert_eq!(key.len(), 36);
/// assert_ne!(key, generate_license_key());
/// ```
pub fn generate_license_key() -> String {
    Uuid::new_v4().to_string()
}

/// Number of leading token characters kept by [`redact_token`].
const REDACTED_PREFIX_LEN: usize = 8;

/// Shorten a token for logs so the full bearer value is never written out.
///
/// ```
/// use guildkey::license_key::redact_token;
///
/// assert_eq!(redact_token("0b7c9f1e-8a52-4c4e-9a51-3f1f3c1d2e4f"), "0b7c9f1e****");
/// ```
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(REDACTED_PREFIX_LEN).collect();
    format!("{prefix}****")
}

/// Resolve the label stored for a new key: trimmed, or the default when blank.
pub fn normalize_client_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => DEFAULT_CLIENT_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_uuid_v4() {
        let key = generate_license_key();
        let parsed = Uuid::parse_str(&key).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn redacted_token_hides_the_tail() {
        let key = generate_license_key();
        let redacted = redact_token(&key);
        assert!(redacted.starts_with(&key[..8]));
        assert!(!redacted.contains(&key[8..]));
        assert_eq!(redact_token("abc"), "abc****");
    }

    #[test]
    fn blank_client_name_falls_back_to_default() {
        assert_eq!(normalize_client_name(None), DEFAULT_CLIENT_NAME);
        assert_eq!(normalize_client_name(Some("   ")), DEFAULT_CLIENT_NAME);
        assert_eq!(normalize_client_name(Some("  Acme ")), "Acme");
    }
}
