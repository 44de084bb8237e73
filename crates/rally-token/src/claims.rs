//! The claim set carried inside every token.

use std::fmt;

use rally_protocol::{AccountId, SessionId};
use serde::{Deserialize, Serialize};

/// Which of the two token kinds a token is.
///
/// Serialized lowercase under the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived; authorizes requests.
    Access,
    /// Long-lived; only mints new access tokens.
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

/// Decoded token contents.
///
/// JSON shape:
///
/// ```text
/// { "user_id": 7, "username": "ana", "type": "access",
///   "session_id": "9f0c…", "exp": 1700000900 }
/// ```
///
/// `username` is only present on access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub session_id: SessionId,
    /// Expiry instant as Unix seconds.
    pub exp: i64,
}

impl Claims {
    /// Claims for an access token. `exp` is filled in by the codec.
    pub fn access(user_id: AccountId, username: &str, session_id: SessionId) -> Self {
        Self {
            user_id,
            username: Some(username.to_string()),
            kind: TokenKind::Access,
            session_id,
            exp: 0,
        }
    }

    /// Claims for a refresh token. `exp` is filled in by the codec.
    pub fn refresh(user_id: AccountId, session_id: SessionId) -> Self {
        Self {
            user_id,
            username: None,
            kind: TokenKind::Refresh,
            session_id,
            exp: 0,
        }
    }
}
