//! Activity tracking on authenticated requests.
//!
//! Each authenticated request outside the exemption list bumps the
//! account's `last_activity`. That timestamp is what the login staleness
//! check reads, so an active player keeps their session and an idle one
//! can be replaced by a fresh login elsewhere.
//!
//! Which paths are exempt is the calling layer's decision. This module
//! only evaluates the list it is given.

use std::collections::HashSet;
use std::sync::Arc;

use rally_protocol::AccountId;
use rally_token::Clock;

use crate::{AccountStore, AuthError};

/// Request paths that skip activity tracking (login, token refresh,
/// match-lifecycle callbacks, ...). Matched exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExemptPaths {
    paths: HashSet<String>,
}

impl ExemptPaths {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// What [`ActivityTracker::record`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOutcome {
    /// The path is exempt; nothing was checked or written.
    Exempt,
    /// The account is online and its `last_activity` is now.
    Recorded,
}

/// Updates `last_activity` and rejects requests from offline accounts.
pub struct ActivityTracker {
    accounts: Arc<AccountStore>,
    clock: Arc<dyn Clock>,
    exempt: ExemptPaths,
}

impl ActivityTracker {
    pub fn new(accounts: Arc<AccountStore>, clock: Arc<dyn Clock>, exempt: ExemptPaths) -> Self {
        Self {
            accounts,
            clock,
            exempt,
        }
    }

    pub fn exempt_paths(&self) -> &ExemptPaths {
        &self.exempt
    }

    /// Runs the activity check for one authenticated request.
    ///
    /// # Errors
    /// - [`AuthError::SessionOffline`]: the account was logged out from
    ///   under this request
    /// - [`AuthError::AccountNotFound`]: the account is gone
    pub async fn record(
        &self,
        path: &str,
        account_id: AccountId,
    ) -> Result<ActivityOutcome, AuthError> {
        if self.exempt.is_exempt(path) {
            return Ok(ActivityOutcome::Exempt);
        }

        let mut account = self
            .accounts
            .lock(account_id)
            .await
            .ok_or(AuthError::AccountNotFound(account_id))?;
        if !account.is_online() {
            tracing::debug!(%account_id, path, "request from offline account rejected");
            return Err(AuthError::SessionOffline(account_id));
        }
        account.touch(self.clock.now());
        Ok(ActivityOutcome::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use rally_protocol::SessionId;
    use rally_token::ManualClock;

    use super::*;

    struct Fixture {
        clock: Arc<ManualClock>,
        accounts: Arc<AccountStore>,
        tracker: ActivityTracker,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let accounts = Arc::new(AccountStore::new(clock.clone()));
        let tracker = ActivityTracker::new(
            accounts.clone(),
            clock.clone(),
            ExemptPaths::new(["/api/users/login/"]),
        );
        Fixture {
            clock,
            accounts,
            tracker,
        }
    }

    async fn online_account(fx: &Fixture) -> AccountId {
        let id = fx.accounts.register("ana", "h".into()).await.unwrap();
        fx.accounts
            .lock(id)
            .await
            .unwrap()
            .start_session(SessionId("s".into()), fx.clock.now());
        id
    }

    #[tokio::test]
    async fn test_record_online_account_updates_last_activity() {
        let fx = fixture();
        let id = online_account(&fx).await;
        fx.clock.advance(Duration::minutes(4));

        let outcome = fx.tracker.record("/api/users/me/", id).await.unwrap();

        assert_eq!(outcome, ActivityOutcome::Recorded);
        let acc = fx.accounts.snapshot(id).await.unwrap();
        assert_eq!(acc.last_activity(), fx.clock.now());
    }

    #[tokio::test]
    async fn test_record_offline_account_returns_session_offline() {
        let fx = fixture();
        let id = fx.accounts.register("ana", "h".into()).await.unwrap();

        let result = fx.tracker.record("/api/users/me/", id).await;

        assert_matches!(result, Err(AuthError::SessionOffline(a)) if a == id);
    }

    #[tokio::test]
    async fn test_record_exempt_path_skips_offline_check() {
        let fx = fixture();
        let id = fx.accounts.register("ana", "h".into()).await.unwrap();
        let before = fx.accounts.snapshot(id).await.unwrap().last_activity();
        fx.clock.advance(Duration::minutes(4));

        let outcome = fx.tracker.record("/api/users/login/", id).await.unwrap();

        assert_eq!(outcome, ActivityOutcome::Exempt);
        let after = fx.accounts.snapshot(id).await.unwrap().last_activity();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_record_unknown_account_returns_not_found() {
        let fx = fixture();
        let result = fx.tracker.record("/api/users/me/", AccountId(42)).await;
        assert_matches!(result, Err(AuthError::AccountNotFound(_)));
    }

    #[test]
    fn test_exempt_paths_match_exactly() {
        let exempt = ExemptPaths::new(["/api/users/login/"]);
        assert!(exempt.is_exempt("/api/users/login/"));
        assert!(!exempt.is_exempt("/api/users/login"));
        assert!(!exempt.is_exempt("/api/users/login/extra"));
        assert_eq!(exempt.len(), 1);
        assert!(ExemptPaths::default().is_empty());
    }
}
