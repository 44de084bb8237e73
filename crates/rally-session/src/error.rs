//! Error types for the session layer.

use rally_protocol::AccountId;
use rally_token::{TokenError, TokenKind};

/// Everything that can go wrong in a login, refresh, logout, validation or
/// activity check.
///
/// All variants are recoverable: the caller reports them and decides
/// whether to retry (e.g. log in again after `Expired`).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account already holds a session that is not idle.
    #[error("account {0} is already logged in on another device")]
    ConcurrentSessionConflict(AccountId),

    /// The token's expiry instant has passed.
    #[error("token has expired")]
    Expired,

    /// Bad signature or structure.
    #[error("invalid token: {0}")]
    Malformed(String),

    /// The token string is in the revocation ledger.
    #[error("token has been revoked")]
    Revoked,

    /// A refresh token where an access token belongs, or vice versa.
    #[error("invalid token type: expected {expected}, got {found}")]
    WrongTokenType { expected: TokenKind, found: TokenKind },

    /// The token's session is not the account's current session.
    /// Covers reuse after logout and replay after a newer login.
    #[error("session mismatch, please log in again")]
    SessionMismatch,

    /// The token names an account that no longer exists.
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    /// A required token is absent, or the Authorization header is not
    /// `Bearer <token>`.
    #[error("{0} is required")]
    MissingToken(&'static str),

    /// The account was logged out underneath an authenticated request.
    #[error("account {0} is offline")]
    SessionOffline(AccountId),

    /// Registration tried to reuse a username.
    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    /// Hashing or signing failed. Never caused by client input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::Expired,
            TokenError::Malformed(reason) => Self::Malformed(reason),
            e @ TokenError::ExpiryOutOfRange => Self::Internal(e.to_string()),
            TokenError::Signing(e) => Self::Internal(e.to_string()),
        }
    }
}
