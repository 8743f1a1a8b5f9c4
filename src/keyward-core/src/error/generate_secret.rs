use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateSecretError {
    #[error("Secure entropy source is unavailable; no secret was generated")]
    EntropyUnavailable,
}

#[derive(Error, Debug)]
pub enum ParseSecretError {
    #[error("Token secret is not valid base64")]
    InvalidEncoding(#[source] base64::DecodeError),

    #[error("Token secret must decode to {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}
