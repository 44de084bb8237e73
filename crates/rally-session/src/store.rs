//! The account store: one session slot per account, with per-account
//! exclusion.
//!
//! # Locking model
//!
//! ```text
//! AccountStore
//! ├── directory: RwLock<Directory>          (who exists, username index)
//! └── per account: Arc<Mutex<Account>>      (the session slot)
//! ```
//!
//! The directory lock is only held long enough to find an account's
//! mutex. Transitions then hold that account's mutex for their whole
//! read-check-write, so two logins on the same account are serialized
//! while logins on different accounts run in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rally_protocol::{AccountId, AccountSummary};
use rally_token::Clock;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{Account, AuthError};

#[derive(Default)]
struct Directory {
    by_id: HashMap<AccountId, Arc<Mutex<Account>>>,
    by_username: HashMap<String, AccountId>,
}

/// In-memory account store.
///
/// Shared as `Arc<AccountStore>` between the authentication service, the
/// activity tracker, and the relationship service.
pub struct AccountStore {
    directory: RwLock<Directory>,
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl AccountStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            directory: RwLock::new(Directory::default()),
            next_id: AtomicU64::new(1),
            clock,
        }
    }

    /// Inserts a new account with no session.
    ///
    /// Registration itself (field validation, password policy) lives
    /// outside this core; this is only the storage step.
    ///
    /// # Errors
    /// [`AuthError::UsernameTaken`] if the username is already in use.
    pub async fn register(
        &self,
        username: &str,
        credential_hash: String,
    ) -> Result<AccountId, AuthError> {
        let mut dir = self.directory.write().await;
        if dir.by_username.contains_key(username) {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }

        let id = AccountId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let account = Account::new(id, username.to_string(), credential_hash, self.clock.now());
        dir.by_username.insert(username.to_string(), id);
        dir.by_id.insert(id, Arc::new(Mutex::new(account)));

        tracing::info!(account_id = %id, username, "account registered");
        Ok(id)
    }

    /// Resolves a username to an account id.
    pub async fn find_by_username(&self, username: &str) -> Option<AccountId> {
        self.directory.read().await.by_username.get(username).copied()
    }

    /// Acquires the exclusive guard for one account.
    ///
    /// Hold the returned guard across the whole check-and-transition.
    /// Returns `None` if the account does not exist.
    pub async fn lock(&self, id: AccountId) -> Option<OwnedMutexGuard<Account>> {
        // Clone the Arc and release the directory lock before waiting on
        // the account mutex, so a slow transition on one account never
        // blocks lookups of others.
        let slot = self.directory.read().await.by_id.get(&id).cloned()?;
        Some(slot.lock_owned().await)
    }

    /// A point-in-time copy of one account.
    pub async fn snapshot(&self, id: AccountId) -> Option<Account> {
        let guard = self.lock(id).await?;
        Some(guard.clone())
    }

    /// Copies of every account, ordered by id.
    pub async fn snapshot_all(&self) -> Vec<Account> {
        let slots: Vec<Arc<Mutex<Account>>> =
            self.directory.read().await.by_id.values().cloned().collect();

        let mut accounts = Vec::with_capacity(slots.len());
        for slot in slots {
            accounts.push(slot.lock().await.clone());
        }
        accounts.sort_by_key(Account::id);
        accounts
    }

    /// Public view of one account.
    pub async fn summary(&self, id: AccountId) -> Option<AccountSummary> {
        let guard = self.lock(id).await?;
        Some(guard.summary())
    }

    pub async fn contains(&self, id: AccountId) -> bool {
        self.directory.read().await.by_id.contains_key(&id)
    }

    /// Deletes an account. Used by the account-deletion flow, which
    /// lives outside this core.
    pub async fn remove(&self, id: AccountId) -> Option<Account> {
        let slot = {
            let mut dir = self.directory.write().await;
            let slot = dir.by_id.remove(&id)?;
            dir.by_username.retain(|_, account_id| *account_id != id);
            slot
        };
        let account = slot.lock().await.clone();
        tracing::info!(account_id = %id, "account removed");
        Some(account)
    }

    pub async fn len(&self) -> usize {
        self.directory.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.directory.read().await.by_id.is_empty()
    }
}
