//! Well-formedness checks applied before anything is sent to the daemon.
use crate::error::validation::ValidationError;
use regex::Regex;

lazy_static::lazy_static! {
    static ref SLUG: Regex = Regex::new(r"^[a-z0-9][a-z0-9\-_]{0,63}$").unwrap();
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, "must not be empty"))
    } else {
        Ok(())
    }
}

/// Lowercase letters, digits, dashes and underscores; 1 to 64 characters,
/// starting with a letter or digit. Used for usernames and machine names.
pub fn validate_slug(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    if SLUG.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            "only lowercase letters, numbers, dashes and underscores are allowed (max 64)",
        ))
    }
}

pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    require_non_empty("email", value)?;
    if EMAIL.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("email", "not a valid email address"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_accepts_typical_names() {
        assert!(validate_slug("name", "api-server_01").is_ok());
        assert!(validate_slug("name", "a").is_ok());
    }

    #[test]
    fn slug_rejects_bad_names() {
        assert!(validate_slug("name", "").is_err());
        assert!(validate_slug("name", "-leading").is_err());
        assert!(validate_slug("name", "Upper").is_err());
        assert!(validate_slug("name", &"x".repeat(65)).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("jo@example.com").is_ok());
        assert!(validate_email("jo@example").is_err());
        assert!(validate_email("  ").is_err());
    }

    #[test]
    fn error_names_the_field() {
        let err = require_non_empty("full name", " ").unwrap_err();
        assert_eq!(err.field, "full name");
        assert_eq!(err.to_string(), "Invalid full name: must not be empty");
    }
}
