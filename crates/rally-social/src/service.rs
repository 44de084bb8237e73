//! Relationship service: friend requests, responses, removal, listings.
//!
//! All edges live in one map keyed by [`PairKey`]. Every read-then-write
//! transition runs under the map's write lock, so two racing requests for
//! the same pair (in either direction) serialize and the second one sees
//! the first one's row.
//!
//! Lock discipline: the edge lock is never held while waiting on the
//! account store. Listings copy the ids they need, drop the edge lock, and
//! only then resolve account summaries.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use rally_protocol::{AccountId, FriendAction, FriendEntry, IncomingRequest, RelationStatus};
use rally_session::AccountStore;
use rally_token::Clock;
use tokio::sync::RwLock;

use crate::{Friendship, FriendshipStatus, PairKey, SocialError};

pub struct RelationshipService {
    accounts: Arc<AccountStore>,
    edges: RwLock<HashMap<PairKey, Friendship>>,
    clock: Arc<dyn Clock>,
}

impl RelationshipService {
    pub fn new(accounts: Arc<AccountStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts,
            edges: RwLock::new(HashMap::new()),
            clock,
        }
    }

    // -----------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------

    /// Sends a friend request from `requester` to `recipient`.
    ///
    /// # Errors
    /// - [`SocialError::SelfFriend`]: `requester == recipient`
    /// - [`SocialError::AccountNotFound`]: either account is unknown
    /// - [`SocialError::AlreadyExists`]: the pair already has a row,
    ///   pending in either direction or accepted
    pub async fn request(
        &self,
        requester: AccountId,
        recipient: AccountId,
    ) -> Result<(), SocialError> {
        if requester == recipient {
            return Err(SocialError::SelfFriend);
        }
        for id in [requester, recipient] {
            if !self.accounts.contains(id).await {
                return Err(SocialError::AccountNotFound(id));
            }
        }

        let key = PairKey::new(requester, recipient);
        let mut edges = self.edges.write().await;
        match edges.entry(key) {
            Entry::Occupied(_) => {
                tracing::debug!(%requester, %recipient, "friend request rejected: pair exists");
                Err(SocialError::AlreadyExists)
            }
            Entry::Vacant(slot) => {
                slot.insert(Friendship::pending(requester, recipient, self.clock.now()));
                tracing::info!(%requester, %recipient, "friend request sent");
                Ok(())
            }
        }
    }

    /// Answers a pending request that `requester` sent to `recipient`.
    ///
    /// Accept moves the row to `Accepted`; decline deletes it.
    ///
    /// # Errors
    /// - [`SocialError::AccountNotFound`]: `requester` is unknown
    /// - [`SocialError::RequestNotFound`]: no pending row from `requester`
    ///   to `recipient`. Only the recipient can answer.
    pub async fn respond(
        &self,
        recipient: AccountId,
        requester: AccountId,
        action: FriendAction,
    ) -> Result<(), SocialError> {
        if !self.accounts.contains(requester).await {
            return Err(SocialError::AccountNotFound(requester));
        }

        let key = PairKey::new(requester, recipient);
        let mut edges = self.edges.write().await;
        let Some(edge) = edges.get_mut(&key) else {
            return Err(SocialError::RequestNotFound);
        };
        if !edge.is_pending_from(requester, recipient) {
            return Err(SocialError::RequestNotFound);
        }

        match action {
            FriendAction::Accept => {
                edge.status = FriendshipStatus::Accepted;
                edge.responded_at = Some(self.clock.now());
                tracing::info!(%requester, %recipient, "friend request accepted");
            }
            FriendAction::Decline => {
                edges.remove(&key);
                tracing::info!(%requester, %recipient, "friend request declined");
            }
        }
        Ok(())
    }

    /// Ends an accepted friendship. Either side may call it.
    ///
    /// # Errors
    /// - [`SocialError::AccountNotFound`]: `friend` is unknown
    /// - [`SocialError::NotFriends`]: the pair is not currently accepted.
    ///   Pending requests are answered with [`respond`](Self::respond),
    ///   not removed here.
    pub async fn remove(&self, account: AccountId, friend: AccountId) -> Result<(), SocialError> {
        if !self.accounts.contains(friend).await {
            return Err(SocialError::AccountNotFound(friend));
        }

        let key = PairKey::new(account, friend);
        let mut edges = self.edges.write().await;
        match edges.get(&key) {
            Some(edge) if edge.is_accepted() => {
                edges.remove(&key);
                tracing::info!(%account, %friend, "friendship removed");
                Ok(())
            }
            _ => Err(SocialError::NotFriends),
        }
    }

    /// Drops every edge touching `account` and returns how many went.
    ///
    /// Called when an account is deleted so no dangling rows point at it.
    pub async fn forget_account(&self, account: AccountId) -> usize {
        let mut edges = self.edges.write().await;
        let before = edges.len();
        edges.retain(|key, _| !key.contains(account));
        let dropped = before - edges.len();
        if dropped > 0 {
            tracing::info!(%account, dropped, "friendships dropped for deleted account");
        }
        dropped
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// The accepted friends of `account`, ordered by friend id.
    ///
    /// # Errors
    /// [`SocialError::AccountNotFound`] for an unknown account.
    pub async fn list_friends(&self, account: AccountId) -> Result<Vec<FriendEntry>, SocialError> {
        if !self.accounts.contains(account).await {
            return Err(SocialError::AccountNotFound(account));
        }

        let mut friend_ids: Vec<AccountId> = {
            let edges = self.edges.read().await;
            edges
                .values()
                .filter(|edge| edge.is_accepted())
                .filter_map(|edge| edge.counterpart(account))
                .collect()
        };
        friend_ids.sort_unstable();

        let mut friends = Vec::with_capacity(friend_ids.len());
        for id in friend_ids {
            // An account deleted mid-listing is simply skipped.
            if let Some(friend) = self.accounts.summary(id).await {
                friends.push(FriendEntry { friend });
            }
        }
        Ok(friends)
    }

    /// Pending requests addressed to `account`, oldest first (ties broken by
    /// requester id). Empty when there are none.
    pub async fn list_incoming(&self, account: AccountId) -> Vec<IncomingRequest> {
        let mut pending: Vec<_> = {
            let edges = self.edges.read().await;
            edges
                .values()
                .filter(|edge| {
                    edge.status == FriendshipStatus::Pending && edge.recipient == account
                })
                .map(|edge| (edge.created_at, edge.requester))
                .collect()
        };
        pending.sort_unstable();

        let mut requests = Vec::with_capacity(pending.len());
        for (created_at, requester) in pending {
            if let Some(requester) = self.accounts.summary(requester).await {
                requests.push(IncomingRequest {
                    requester,
                    created_at,
                });
            }
        }
        requests
    }

    /// `none`, `pending` or `accepted` for the pair. Never fails; an
    /// account compared with itself is `none`.
    pub async fn status_of(&self, a: AccountId, b: AccountId) -> RelationStatus {
        if a == b {
            return RelationStatus::None;
        }
        self.edges
            .read()
            .await
            .get(&PairKey::new(a, b))
            .map_or(RelationStatus::None, |edge| edge.status.into())
    }

    /// The raw edge for a pair, if any.
    pub async fn friendship(&self, a: AccountId, b: AccountId) -> Option<Friendship> {
        self.edges.read().await.get(&PairKey::new(a, b)).cloned()
    }

    /// Number of rows, pending and accepted.
    pub async fn edge_count(&self) -> usize {
        self.edges.read().await.len()
    }
}
