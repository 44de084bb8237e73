//! Error types for the relationship layer.

use rally_protocol::AccountId;

/// Errors that can occur during friendship operations.
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    /// An account tried to befriend itself.
    #[error("cannot send a friend request to yourself")]
    SelfFriend,

    /// A row already exists for the pair, in either direction or state.
    #[error("friendship already exists or is pending")]
    AlreadyExists,

    /// No pending request from that requester to answer.
    #[error("friend request not found")]
    RequestNotFound,

    /// The pair is not currently friends, so there is nothing to remove.
    #[error("friendship does not exist")]
    NotFriends,

    /// The counterpart account does not exist.
    #[error("account {0} not found")]
    AccountNotFound(AccountId),
}
