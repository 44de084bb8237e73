//! HS256 token issue/decode.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::{Claims, Clock, TokenError};

/// Issues and decodes signed, expiring tokens.
///
/// The signing key is process-wide configuration handed in at startup.
/// Given identical claims, clock reading and key, [`issue`](Self::issue)
/// produces byte-identical tokens.
///
/// Expiry is judged against the injected [`Clock`], not the system clock,
/// so jsonwebtoken's own `exp` check is switched off and replaced by ours.
/// The `exp` claim itself is still mandatory.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Creates a codec that signs with `secret`.
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            clock,
        }
    }

    /// Signs `claims` with an expiry of `now + ttl`.
    ///
    /// Any `exp` already present on `claims` is overwritten.
    ///
    /// # Errors
    /// - [`TokenError::ExpiryOutOfRange`]: `now + ttl` overflows
    /// - [`TokenError::Signing`]: the JWT library rejects the input
    pub fn issue(&self, mut claims: Claims, ttl: Duration) -> Result<String, TokenError> {
        let exp = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        claims.exp = exp.timestamp();
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Verifies signature and expiry and returns the claims.
    ///
    /// Does not look at the token kind or the session id; that is the
    /// caller's job.
    ///
    /// # Errors
    /// - [`TokenError::Malformed`]: bad signature, structure, or claims
    /// - [`TokenError::Expired`]: `now > exp`
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        let claims = data.claims;
        if self.clock.now().timestamp() > claims.exp {
            tracing::debug!(user_id = %claims.user_id, kind = %claims.kind, "token expired");
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
