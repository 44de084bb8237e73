//! Unified error type for Rally.

use rally_protocol::{ErrorBody, Method, ProtocolError};
use rally_session::AuthError;
use rally_social::SocialError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The gateway turns any of these into an error response with
/// [`status`](Self::status) and [`to_body`](Self::to_body). The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RallyError {
    /// Encode/decode problems, including malformed request bodies.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Login, token and session failures.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Friendship failures.
    #[error(transparent)]
    Social(#[from] SocialError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or accepting sockets.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or framing.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("no route for {0}")]
    RouteNotFound(String),

    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed { method: Method, path: String },
}

impl RallyError {
    /// Stable snake_case code for clients to branch on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Protocol(ProtocolError::Encode(_)) => "internal",
            Self::Protocol(_) => "bad_request",
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "invalid_credentials",
                AuthError::ConcurrentSessionConflict(_) => "concurrent_session",
                AuthError::Expired => "token_expired",
                AuthError::Malformed(_) => "token_invalid",
                AuthError::Revoked => "token_revoked",
                AuthError::WrongTokenType { .. } => "wrong_token_type",
                AuthError::SessionMismatch => "session_mismatch",
                AuthError::AccountNotFound(_) => "account_not_found",
                AuthError::MissingToken(_) => "missing_token",
                AuthError::SessionOffline(_) => "session_offline",
                AuthError::UsernameTaken(_) => "username_taken",
                AuthError::Internal(_) => "internal",
            },
            Self::Social(err) => match err {
                SocialError::SelfFriend => "self_friend",
                SocialError::AlreadyExists => "already_exists",
                SocialError::RequestNotFound => "request_not_found",
                SocialError::NotFriends => "friendship_not_found",
                SocialError::AccountNotFound(_) => "account_not_found",
            },
            Self::Config(_) | Self::Io(_) | Self::WebSocket(_) => "internal",
            Self::RouteNotFound(_) => "route_not_found",
            Self::MethodNotAllowed { .. } => "method_not_allowed",
        }
    }

    /// HTTP-style status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::Protocol(ProtocolError::Encode(_)) => 500,
            Self::Protocol(_) => 400,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::Expired
                | AuthError::Malformed(_)
                | AuthError::Revoked
                | AuthError::WrongTokenType { .. } => 401,
                AuthError::ConcurrentSessionConflict(_) | AuthError::SessionOffline(_) => 403,
                AuthError::AccountNotFound(_) => 404,
                AuthError::SessionMismatch
                | AuthError::MissingToken(_)
                | AuthError::UsernameTaken(_) => 400,
                AuthError::Internal(_) => 500,
            },
            Self::Social(err) => match err {
                SocialError::SelfFriend
                | SocialError::AlreadyExists
                | SocialError::NotFriends => 400,
                SocialError::RequestNotFound | SocialError::AccountNotFound(_) => 404,
            },
            Self::Config(_) | Self::Io(_) | Self::WebSocket(_) => 500,
            Self::RouteNotFound(_) => 404,
            Self::MethodNotAllowed { .. } => 405,
        }
    }

    /// The wire form. Server-side failures get a generic message so
    /// internals never reach the client.
    pub fn to_body(&self) -> ErrorBody {
        let message = if self.status() >= 500 {
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        ErrorBody {
            code: self.code().to_string(),
            message,
        }
    }
}
