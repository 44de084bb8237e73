//! The friendship edge and its canonical pair key.

use chrono::{DateTime, Utc};
use rally_protocol::{AccountId, RelationStatus};

// ---------------------------------------------------------------------------
// PairKey
// ---------------------------------------------------------------------------

/// Canonical key for an unordered pair of accounts.
///
/// `PairKey::new(a, b) == PairKey::new(b, a)`, so a map keyed by `PairKey`
/// can hold at most one edge per pair no matter who sent the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: AccountId,
    high: AccountId,
}

impl PairKey {
    pub fn new(a: AccountId, b: AccountId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn contains(&self, account: AccountId) -> bool {
        self.low == account || self.high == account
    }
}

// ---------------------------------------------------------------------------
// FriendshipStatus
// ---------------------------------------------------------------------------

/// Persisted state of an edge.
///
/// ```text
///   (no row) ──request──→ Pending ──accept──→ Accepted
///       ↑                    │                   │
///       └──────decline───────┘                   │
///       └──────────────────remove────────────────┘
/// ```
///
/// There is no `Declined` state: declining deletes the row, so the pair
/// can start over with a fresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl From<FriendshipStatus> for RelationStatus {
    fn from(status: FriendshipStatus) -> Self {
        match status {
            FriendshipStatus::Pending => RelationStatus::Pending,
            FriendshipStatus::Accepted => RelationStatus::Accepted,
        }
    }
}

// ---------------------------------------------------------------------------
// Friendship
// ---------------------------------------------------------------------------

/// One directed edge. The direction only records who asked whom; the
/// relationship itself is undirected once accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friendship {
    pub requester: AccountId,
    pub recipient: AccountId,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    /// Set when the recipient accepts.
    pub responded_at: Option<DateTime<Utc>>,
}

impl Friendship {
    pub(crate) fn pending(
        requester: AccountId,
        recipient: AccountId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            requester,
            recipient,
            status: FriendshipStatus::Pending,
            created_at,
            responded_at: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == FriendshipStatus::Accepted
    }

    /// Whether this is a pending request sent by `requester` to `recipient`.
    pub fn is_pending_from(&self, requester: AccountId, recipient: AccountId) -> bool {
        self.status == FriendshipStatus::Pending
            && self.requester == requester
            && self.recipient == recipient
    }

    /// The side of the edge that is not `id`.
    pub fn counterpart(&self, id: AccountId) -> Option<AccountId> {
        if self.requester == id {
            Some(self.recipient)
        } else if self.recipient == id {
            Some(self.requester)
        } else {
            None
        }
    }
}
