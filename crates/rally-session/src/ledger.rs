//! The revocation ledger: token strings that must never be trusted again.
//!
//! Append-only. Nothing in this core removes an entry; pruning entries
//! whose tokens have expired anyway is a separate housekeeping job.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rally_protocol::AccountId;
use rally_token::TokenKind;
use tokio::sync::RwLock;

/// One revoked token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedToken {
    /// The raw token string, exactly as the client presented it.
    pub token: String,
    pub kind: TokenKind,
    pub account_id: AccountId,
    pub revoked_at: DateTime<Utc>,
}

impl RevokedToken {
    pub fn new(
        token: impl Into<String>,
        kind: TokenKind,
        account_id: AccountId,
        revoked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            kind,
            account_id,
            revoked_at,
        }
    }
}

/// In-memory revocation ledger keyed by token string.
#[derive(Default)]
pub struct RevocationLedger {
    entries: RwLock<HashMap<String, RevokedToken>>,
}

impl RevocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch of entries under one write lock, so a reader never
    /// sees half of a batch.
    ///
    /// Re-revoking a token keeps the first record.
    pub async fn revoke_all(&self, tokens: impl IntoIterator<Item = RevokedToken>) {
        let mut entries = self.entries.write().await;
        for revoked in tokens {
            tracing::debug!(
                account_id = %revoked.account_id,
                kind = %revoked.kind,
                "token revoked"
            );
            entries.entry(revoked.token.clone()).or_insert(revoked);
        }
    }

    /// Point read: is this exact token string revoked?
    pub async fn is_revoked(&self, token: &str) -> bool {
        self.entries.read().await.contains_key(token)
    }

    /// The ledger record for a token, if any.
    pub async fn entry(&self, token: &str) -> Option<RevokedToken> {
        self.entries.read().await.get(token).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_revoke_all_makes_every_token_revoked() {
        let ledger = RevocationLedger::new();

        ledger
            .revoke_all([
                RevokedToken::new("acc", TokenKind::Access, AccountId(1), t0()),
                RevokedToken::new("ref", TokenKind::Refresh, AccountId(1), t0()),
            ])
            .await;

        assert!(ledger.is_revoked("acc").await);
        assert!(ledger.is_revoked("ref").await);
        assert!(!ledger.is_revoked("other").await);
        assert_eq!(ledger.len().await, 2);
    }

    #[tokio::test]
    async fn test_revoke_twice_keeps_first_record() {
        let ledger = RevocationLedger::new();
        ledger
            .revoke_all([RevokedToken::new("t", TokenKind::Access, AccountId(1), t0())])
            .await;

        ledger
            .revoke_all([RevokedToken::new(
                "t",
                TokenKind::Access,
                AccountId(1),
                t0() + Duration::hours(1),
            )])
            .await;

        assert_eq!(ledger.len().await, 1);
        assert_eq!(ledger.entry("t").await.unwrap().revoked_at, t0());
    }

    #[tokio::test]
    async fn test_new_ledger_is_empty() {
        let ledger = RevocationLedger::new();
        assert!(ledger.is_empty().await);
        assert!(ledger.entry("t").await.is_none());
    }
}
