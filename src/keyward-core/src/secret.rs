//! Token secrets for machine credentials.
//!
//! A secret is 18 bytes from a secure random source, base64 encoded on the
//! wire. It is handed to the caller once, together with the machine it was
//! created for, and is never logged or kept anywhere else.
use crate::error::generate_secret::{GenerateSecretError, ParseSecretError};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Serialize, Serializer};
use std::fmt;

pub const TOKEN_SECRET_SIZE: usize = 18;

/// Source of cryptographically secure random bytes.
pub trait EntropySource: Send + Sync {
    /// Fills `dest` completely or fails. A failure must never leave a
    /// partially filled buffer in use.
    fn fill(&self, dest: &mut [u8]) -> Result<(), ring::error::Unspecified>;
}

impl EntropySource for SystemRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), ring::error::Unspecified> {
        SecureRandom::fill(self, dest)
    }
}

pub struct TokenSecret {
    raw: [u8; TOKEN_SECRET_SIZE],
}

impl TokenSecret {
    /// Generates a fresh secret from the operating system's secure RNG.
    pub fn generate() -> Result<Self, GenerateSecretError> {
        Self::generate_from(&SystemRandom::new())
    }

    pub fn generate_from(source: &dyn EntropySource) -> Result<Self, GenerateSecretError> {
        let mut raw = [0u8; TOKEN_SECRET_SIZE];
        source
            .fill(&mut raw)
            .map_err(|_| GenerateSecretError::EntropyUnavailable)?;
        Ok(Self { raw })
    }

    /// Parses the transport encoding of a secret.
    pub fn from_encoded(encoded: &str) -> Result<Self, ParseSecretError> {
        let decoded = base64::decode(encoded).map_err(ParseSecretError::InvalidEncoding)?;
        let raw: [u8; TOKEN_SECRET_SIZE] =
            decoded
                .as_slice()
                .try_into()
                .map_err(|_| ParseSecretError::WrongLength {
                    expected: TOKEN_SECRET_SIZE,
                    actual: decoded.len(),
                })?;
        Ok(Self { raw })
    }

    /// The transport encoding of this secret.
    pub fn encoded(&self) -> String {
        base64::encode(self.raw)
    }

    pub fn decoded(&self) -> &[u8] {
        &self.raw
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecret(<redacted>)")
    }
}

impl Serialize for TokenSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded())
    }
}
