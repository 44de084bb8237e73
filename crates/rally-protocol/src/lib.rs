//! Wire protocol for Rally.
//!
//! This crate defines the "language" clients and the identity core speak:
//!
//! - **Types**: identity newtypes ([`AccountId`], [`SessionId`]), session
//!   and relationship messages, and the [`ApiRequest`]/[`ApiResponse`]
//!   envelopes.
//! - **Codec**: the [`Codec`] trait and [`JsonCodec`].
//! - **Errors**: [`ProtocolError`].
//!
//! ```text
//! Server (frames) → Protocol (ApiRequest) → Gateway → Session / Social
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    AccessToken, AccountId, AccountSummary, ApiRequest, ApiResponse, ErrorBody,
    FriendAction, FriendEntry, FriendTarget, FriendshipPatch, IdentityBody,
    IncomingRequest, LoginRequest, LogoutRequest, MessageBody, Method,
    RefreshRequest, RelationStatus, SessionId, StatusBody, TokenPair,
};
