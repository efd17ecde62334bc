use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

use crate::config::HasherConfig;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid hasher parameters: {0}")]
    InvalidParams(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Argon2id hasher built from an explicit [`HasherConfig`].
///
/// Credentials are cut to `max_input_bytes` bytes on both hash and verify, so two
/// inputs sharing that prefix produce interchangeable hashes.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    max_input_bytes: usize,
    // Verified against when there is no stored hash, so misses cost the same as hits.
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .field("max_input_bytes", &self.max_input_bytes)
            .finish()
    }
}

impl PasswordHasher {
    pub fn new(config: HasherConfig) -> Result<Self, PasswordError> {
        if config.max_input_bytes == 0 {
            return Err(PasswordError::InvalidParams(
                "max_input_bytes must be positive".into(),
            ));
        }
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        let mut hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            max_input_bytes: config.max_input_bytes,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash(&uuid::Uuid::new_v4().to_string())?;
        Ok(hasher)
    }

    pub fn max_input_bytes(&self) -> usize {
        self.max_input_bytes
    }

    fn truncated<'a>(&self, credential: &'a str) -> &'a [u8] {
        let bytes = credential.as_bytes();
        &bytes[..bytes.len().min(self.max_input_bytes)]
    }

    /// Hashes a credential into a PHC string with a fresh random salt.
    pub fn hash(&self, credential: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(self.truncated(credential), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                PasswordError::Hash(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Checks a credential against a stored PHC string.
    ///
    /// A mismatch is `Ok(false)`; a hash that cannot be parsed or uses an
    /// unsupported algorithm is `Err(MalformedHash)`.
    pub fn verify(&self, plain: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            PasswordError::MalformedHash(e.to_string())
        })?;
        match self.argon2.verify_password(self.truncated(plain), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
        }
    }

    /// Runs a full verification against a throwaway hash and discards the result.
    pub fn verify_dummy(&self, plain: &str) -> bool {
        matches!(self.verify(plain, &self.dummy_hash), Ok(true))
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    // Minimum Argon2 cost keeps the suite fast.
    PasswordHasher::new(HasherConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
        max_input_bytes: 72,
    })
    .expect("test params are valid")
}
