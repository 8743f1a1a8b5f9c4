use crate::error::daemon_call::DaemonCallError;
use crate::error::generate_secret::GenerateSecretError;
use crate::error::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CreateMachineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to generate a token secret for the machine")]
    GenerateSecretFailed(#[source] GenerateSecretError),

    #[error("Failed to create machine '{0}'")]
    DaemonCallFailed(String, #[source] DaemonCallError),
}
