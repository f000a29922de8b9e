//! Request validation utilities for the guildkey API.

use std::fmt;

use crate::errors::LicenseError;

/// Validation error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for LicenseError {
    fn from(err: ValidationError) -> Self {
        LicenseError::BadRequest(err.to_string())
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate that a string is not empty or whitespace only.
///
/// # Example
/// ```
/// use guildkey::server::validation::validate_not_empty;
///
/// assert!(validate_not_empty("hello", "name").is_ok());
/// assert!(validate_not_empty("", "name").is_err());
/// assert!(validate_not_empty("   ", "name").is_err());
/// ```
pub fn validate_not_empty(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "cannot be empty".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate that an optional field is present and not blank.
pub fn validate_present<'a>(value: Option<&'a str>, field_name: &str) -> ValidationResult<&'a str> {
    let value = value.ok_or_else(|| ValidationError {
        field: field_name.to_string(),
        message: "is required".to_string(),
    })?;
    validate_not_empty(value, field_name)?;
    Ok(value)
}

/// Validate that a string is no longer than `max` characters.
///
/// # Example
/// ```
/// use guildkey::server::validation::validate_max_length;
///
/// assert!(validate_max_length("hello", 10, "name").is_ok());
/// assert!(validate_max_length(&"a".repeat(11), 10, "name").is_err());
/// ```
pub fn validate_max_length(value: &str, max: usize, field_name: &str) -> ValidationResult<()> {
    let len = value.chars().count();
    if len > max {
        Err(ValidationError {
            field: field_name.to_string(),
            message: format!("must be at most {max} characters (got {len})"),
        })
    } else {
        Ok(())
    }
}
