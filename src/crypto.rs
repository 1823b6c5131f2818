//! Password hashing.

use std::sync::Arc;

use argon2::password_hash::{
    self, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::config::Argon2 as ArgonConfig;

const SALT_LENGTH: usize = 16;
const OUTPUT_LENGTH: usize = 32;

pub type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
    #[error("secure random source failed: {0}")]
    Randomness(#[from] rand::Error),
    #[error("hashing task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Plaintext password as received from a client.
///
/// The buffer is wiped on drop.
#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// A hashed password stored in the database, in PHC string format.
///
/// Never serialized; only the store reads or writes it.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps a PHC string read back from the store.
    ///
    /// The string is not parsed here: a malformed value surfaces as an error
    /// from [`PasswordManager::matches`].
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHash")
            .field("phc_string", &"[REDACTED]")
            .finish()
    }
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
///
/// Cost parameters come from configuration and apply to every new hash.
/// Verification reads the parameters embedded in the stored PHC string, so
/// raising the cost does not invalidate existing hashes.
#[derive(Debug, Clone)]
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(OUTPUT_LENGTH),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash password using Argon2id with a fresh random salt.
    ///
    /// Fails only if the OS random source or the hash computation fails,
    /// never because of the password content.
    pub fn hash(&self, password: &Password) -> Result<PasswordHash> {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng.try_fill_bytes(&mut salt)?;
        let salt = SaltString::encode_b64(&salt)
            .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(PasswordHash(hash.to_string()))
    }

    /// Verify password against a PHC.
    ///
    /// A wrong password is `Ok(false)`. `Err` means the comparison itself
    /// could not run, e.g. the stored hash is not a valid PHC string.
    pub fn matches(
        &self,
        hash: &PasswordHash,
        password: &Password,
    ) -> Result<bool> {
        let parsed = password_hash::PasswordHash::new(hash.as_str())
            .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(CryptoError::Argon2(err.to_string())),
        }
    }

    /// [`PasswordManager::hash`] on the blocking thread pool.
    pub async fn hash_blocking(
        self: Arc<Self>,
        password: Password,
    ) -> Result<PasswordHash> {
        tokio::task::spawn_blocking(move || self.hash(&password)).await?
    }

    /// [`PasswordManager::matches`] on the blocking thread pool.
    pub async fn matches_blocking(
        self: Arc<Self>,
        hash: PasswordHash,
        password: Password,
    ) -> Result<bool> {
        tokio::task::spawn_blocking(move || self.matches(&hash, &password))
            .await?
    }
}

#[cfg(test)]
pub(crate) fn test_manager() -> PasswordManager {
    // Cheapest parameters argon2 accepts; production cost comes from config.
    PasswordManager::new(Some(ArgonConfig {
        memory_cost: 8,
        iterations: 1,
        parallelism: 1,
    }))
    .unwrap()
}
