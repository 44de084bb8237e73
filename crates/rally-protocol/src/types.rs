//! Core protocol types for Rally's wire format.
//!
//! Every type in this module travels "on the wire": it is serialized by a
//! [`Codec`](crate::Codec), sent to a client, and parsed on the other side.
//! The shapes here are the boundary contract of the identity core, so the
//! field names are stable and covered by tests at the bottom of the file.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for an account.
///
/// Newtype over `u64` so an account id can never be confused with any other
/// number flowing through the system. `#[serde(transparent)]` keeps the JSON
/// form a plain number: `AccountId(42)` is `42` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

/// An opaque session identifier.
///
/// Binds one login event to every token issued for it. At most one live
/// value exists per account at any instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Session messages
// ---------------------------------------------------------------------------

/// Client → Server: credentials for a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Server → Client: the pair of tokens minted by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Client → Server: a refresh token to exchange for a new access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Server → Client: a freshly minted access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
}

/// Client → Server: logout body.
///
/// The refresh token is optional at the wire level so a missing value can
/// be reported as a missing token rather than a malformed body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Server → Client: who the bearer of a validated access token is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityBody {
    pub user_id: AccountId,
    pub username: String,
    pub session_id: SessionId,
}

/// A plain human-readable acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A structured error: a stable machine code plus a human message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Relationship messages
// ---------------------------------------------------------------------------

/// Client → Server: the counterpart of a friend request or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendTarget {
    pub friend_id: AccountId,
}

/// How the recipient answers a pending friend request.
///
/// Serialized lowercase (`"accept"` / `"decline"`); anything else fails to
/// deserialize and is reported as a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendAction {
    Accept,
    Decline,
}

/// Client → Server: answer a pending request from `friend_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendshipPatch {
    pub friend_id: AccountId,
    pub action: FriendAction,
}

/// Public view of an account, as shown in friend lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub username: String,
    pub online: bool,
}

/// One entry of a friend list: always "the other side" of the friendship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendEntry {
    pub friend: AccountSummary,
}

/// One pending request addressed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingRequest {
    pub requester: AccountSummary,
    pub created_at: DateTime<Utc>,
}

/// Relationship of one account relative to another, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationStatus {
    None,
    Pending,
    Accepted,
}

impl fmt::Display for RelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Pending => f.write_str("pending"),
            Self::Accepted => f.write_str("accepted"),
        }
    }
}

/// Server → Client: wrapper for [`RelationStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: RelationStatus,
}

// ---------------------------------------------------------------------------
// Request / response envelopes
// ---------------------------------------------------------------------------

/// The verb of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
            Self::Patch => f.write_str("PATCH"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// A single request as it arrives at the gateway.
///
/// The shape mirrors an HTTP request so the same contract works over any
/// framing: the WebSocket server sends one of these per frame.
///
/// ```text
/// { "id": 7, "method": "POST", "path": "/api/users/login/",
///   "headers": {}, "body": { "username": "ana", "password": "..." } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Correlation id chosen by the client, echoed in the response.
    #[serde(default)]
    pub id: u64,
    pub method: Method,
    pub path: String,
    /// Header names are matched case-insensitively by [`header`](Self::header).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: serde_json::Value,
}

impl ApiRequest {
    /// Creates a request with no headers and a `null` body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: 0,
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: serde_json::Value::Null,
        }
    }

    /// Builder-style: sets a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Builder-style: sets the `Authorization: Bearer <token>` header.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    /// Builder-style: serializes `body` as the JSON body.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if `body` cannot be represented
    /// as JSON.
    pub fn with_body<T: Serialize>(mut self, body: &T) -> Result<Self, ProtocolError> {
        self.body = serde_json::to_value(body).map_err(ProtocolError::Encode)?;
        Ok(self)
    }

    /// Looks up a header, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parses the body as `T`.
    ///
    /// A `null` body is treated as an empty object so that bodies made
    /// only of optional fields still parse.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        let value = match &self.body {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(value).map_err(ProtocolError::Decode)
    }
}

/// The gateway's answer to one [`ApiRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub id: u64,
    /// HTTP-style status code (200, 201, 400, 401, 403, 404, 405, 500).
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    /// Builds a response by serializing `body`.
    pub fn new<T: Serialize>(id: u64, status: u16, body: &T) -> Result<Self, ProtocolError> {
        let body = serde_json::to_value(body).map_err(ProtocolError::Encode)?;
        Ok(Self { id, status, body })
    }

    /// Builds an error response.
    pub fn error(id: u64, status: u16, error: ErrorBody) -> Self {
        // `ErrorBody` is two strings, so building the JSON by hand cannot fail.
        let body = serde_json::json!({
            "code": error.code,
            "message": error.message,
        });
        Self { id, status, body }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.body.clone()).map_err(ProtocolError::Decode)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON shape tests. A mismatch here means a client can't parse us.

    use super::*;

    #[test]
    fn test_account_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&AccountId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_account_id_display() {
        assert_eq!(AccountId(7).to_string(), "A-7");
    }

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionId("abc".into())).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_friend_action_parses_lowercase() {
        let patch: FriendshipPatch =
            serde_json::from_str(r#"{"friend_id": 3, "action": "decline"}"#).unwrap();
        assert_eq!(patch.friend_id, AccountId(3));
        assert_eq!(patch.action, FriendAction::Decline);
    }

    #[test]
    fn test_friend_action_rejects_unknown_action() {
        let result: Result<FriendshipPatch, _> =
            serde_json::from_str(r#"{"friend_id": 3, "action": "block"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_relation_status_serializes_lowercase() {
        let json = serde_json::to_value(StatusBody {
            status: RelationStatus::None,
        })
        .unwrap();
        assert_eq!(json["status"], "none");
        assert_eq!(RelationStatus::Accepted.to_string(), "accepted");
    }

    #[test]
    fn test_method_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Method::Delete).unwrap(), "\"DELETE\"");
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }

    #[test]
    fn test_api_request_parses_minimal_frame() {
        // Headers and body are optional on the wire.
        let req: ApiRequest =
            serde_json::from_str(r#"{"method": "GET", "path": "/api/users/me/"}"#).unwrap();
        assert_eq!(req.id, 0);
        assert_eq!(req.method, Method::Get);
        assert!(req.headers.is_empty());
        assert!(req.body.is_null());
    }

    #[test]
    fn test_api_request_header_lookup_ignores_case() {
        let req = ApiRequest::new(Method::Get, "/").with_bearer("tok");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer tok"));
        assert_eq!(req.header("cookie"), None);
    }

    #[test]
    fn test_api_request_body_as_treats_null_as_empty_object() {
        let req = ApiRequest::new(Method::Post, "/api/users/logout/");
        let body: LogoutRequest = req.body_as().unwrap();
        assert_eq!(body.refresh_token, None);
    }

    #[test]
    fn test_api_request_body_as_reports_missing_field() {
        let req = ApiRequest::new(Method::Post, "/api/users/login/")
            .with_body(&serde_json::json!({ "username": "ana" }))
            .unwrap();
        let result: Result<LoginRequest, _> = req.body_as();
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_api_response_error_shape() {
        let resp = ApiResponse::error(
            9,
            404,
            ErrorBody {
                code: "not_found".into(),
                message: "nothing here".into(),
            },
        );
        assert_eq!(resp.id, 9);
        assert!(!resp.is_success());
        assert_eq!(resp.body["code"], "not_found");
        assert_eq!(resp.body["message"], "nothing here");
    }

    #[test]
    fn test_incoming_request_timestamp_is_rfc3339() {
        use chrono::TimeZone;
        let entry = IncomingRequest {
            requester: AccountSummary {
                id: AccountId(1),
                username: "ana".into(),
                online: true,
            },
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["created_at"], "2024-01-02T03:04:05Z");
        assert_eq!(json["requester"]["username"], "ana");
    }
}
