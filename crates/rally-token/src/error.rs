//! Error types for the token codec.

/// Errors produced while issuing or decoding a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token's expiry instant is in the past.
    #[error("token has expired")]
    Expired,

    /// Bad signature, broken structure, or a missing/ill-typed claim.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// `now + ttl` falls outside the representable date range.
    #[error("token expiry out of range")]
    ExpiryOutOfRange,

    /// Signing failed while issuing. Never caused by client input.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}
