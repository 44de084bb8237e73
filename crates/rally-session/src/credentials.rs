//! Credential verification hook.
//!
//! The identity core never looks inside a credential hash. It hands the
//! submitted password and the stored hash to a [`CredentialVerifier`] and
//! only cares about the yes/no answer. [`Argon2Credentials`] is the
//! production implementation; tests and other deployments can plug in
//! their own.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::AuthError;

/// Checks a password against a stored credential hash.
///
/// `Send + Sync + 'static` because one verifier lives inside the shared
/// authentication service for the whole life of the server.
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Returns `Ok(true)` on a match and `Ok(false)` on a mismatch.
    ///
    /// # Errors
    /// Only for a hash the verifier cannot read at all.
    fn verify(
        &self,
        password: &str,
        credential_hash: &str,
    ) -> impl std::future::Future<Output = Result<bool, AuthError>> + Send;
}

/// Argon2id credentials in PHC string format.
///
/// Hashing and verification are CPU-heavy, so `verify` runs on Tokio's
/// blocking pool instead of stalling a runtime worker.
#[derive(Debug, Clone)]
pub struct Argon2Credentials {
    params: Params,
}

impl Argon2Credentials {
    /// Argon2id with the library's default cost parameters.
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Argon2id with explicit cost parameters (used for new hashes only;
    /// verification always reads the parameters stored in the hash).
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    /// Hashes a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }
}

impl Default for Argon2Credentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialVerifier for Argon2Credentials {
    async fn verify(&self, password: &str, credential_hash: &str) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let credential_hash = credential_hash.to_owned();
        tokio::task::spawn_blocking(move || verify_phc(&password, &credential_hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verifier task failed: {e}")))?
    }
}

fn verify_phc(password: &str, credential_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(credential_hash)
        .map_err(|e| AuthError::Internal(format!("unreadable credential hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Internal(format!("password verification failed: {e}"))),
    }
}
