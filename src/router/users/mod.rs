//! Users-related HTTP API.

pub mod create;
pub mod get;
pub mod password;
pub mod update;

use validator::ValidationError;

/// Letters, digits and underscores only.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username"))
    }
}

/// At least one digit.
fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().any(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("password"))
    }
}
