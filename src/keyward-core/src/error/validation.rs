use thiserror::Error;

/// Input rejected before any network call was made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
