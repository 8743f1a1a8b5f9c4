use crate::error::bootstrap::CollectError;
use crate::error::validation::ValidationError;
use crate::validation::{require_non_empty, validate_email, validate_slug};
use std::fmt;

/// Everything the pipeline needs, gathered before any network call.
/// Lives in memory only and is dropped when the pipeline ends.
pub struct BootstrapContext {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub invite_code: Option<String>,
    pub passphrase: String,
}

impl BootstrapContext {
    /// Checks that every field is present and well formed. Passphrase
    /// strength is the collector's concern.
    pub fn validate(&self, require_invite_code: bool) -> Result<(), ValidationError> {
        require_non_empty("full name", &self.full_name)?;
        validate_slug("username", &self.username)?;
        validate_email(&self.email)?;
        if require_invite_code {
            require_non_empty("invite code", self.invite_code.as_deref().unwrap_or(""))?;
        }
        require_non_empty("passphrase", &self.passphrase)
    }
}

impl fmt::Debug for BootstrapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapContext")
            .field("full_name", &self.full_name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("invite_code", &self.invite_code)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Values supplied up front, typically from the command line.
#[derive(Clone, Debug, Default)]
pub struct SignupDefaults {
    pub email: Option<String>,
    pub invite_code: Option<String>,
}

/// What the collector should ask for.
#[derive(Clone, Debug, Default)]
pub struct CollectRequest {
    pub default_email: Option<String>,
    pub default_invite_code: Option<String>,
    pub ask_invite_code: bool,
}

/// Source of account details, typically an interactive prompt.
pub trait InputCollector {
    fn collect(&mut self, request: &CollectRequest) -> Result<BootstrapContext, CollectError>;
}
