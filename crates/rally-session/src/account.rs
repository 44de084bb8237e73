//! The account record and its session slot.
//!
//! A "session" is not a row of its own. It is the pair (the account's
//! `active_session_id`, the session id embedded in issued tokens), and it
//! is valid only while both match. This module owns the account side.

use chrono::{DateTime, Duration, Utc};
use rally_protocol::{AccountId, AccountSummary, SessionId};
use rand::Rng;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// One identity.
///
/// The session fields are private and only change through
/// [`start_session`](Self::start_session), [`end_session`](Self::end_session)
/// and [`touch`](Self::touch). That keeps the core invariant in one place:
///
/// > `active_session_id` is set **iff** `online` is true.
///
/// ```text
///              login                     logout
///   NoSession ───────→ ActiveSession ──────────→ NoSession
///       ↑                   │
///       └── idle ≥ timeout, observed at the next login
/// ```
///
/// Expiry is lazy: nothing ends an idle session in the background. The
/// next login attempt notices the idleness and replaces it.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    username: String,
    credential_hash: String,
    active_session_id: Option<SessionId>,
    last_activity: DateTime<Utc>,
    online: bool,
}

impl Account {
    pub(crate) fn new(
        id: AccountId,
        username: String,
        credential_hash: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            credential_hash,
            active_session_id: None,
            last_activity: created_at,
            online: false,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Opaque credential hash (PHC string for Argon2 accounts).
    pub fn credential_hash(&self) -> &str {
        &self.credential_hash
    }

    pub fn active_session_id(&self) -> Option<&SessionId> {
        self.active_session_id.as_ref()
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// `true` if the account holds a session idle for at least `timeout`.
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.active_session_id.is_some() && now - self.last_activity >= timeout
    }

    /// `true` if `session_id` is the account's live session.
    pub fn holds_session(&self, session_id: &SessionId) -> bool {
        self.active_session_id.as_ref() == Some(session_id)
    }

    /// Public view for friend lists.
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            username: self.username.clone(),
            online: self.online,
        }
    }

    /// NoSession/ActiveSession → ActiveSession(session_id, now).
    ///
    /// Overwrites any previous session; the caller has already decided it
    /// was stale.
    pub(crate) fn start_session(&mut self, session_id: SessionId, now: DateTime<Utc>) {
        self.active_session_id = Some(session_id);
        self.last_activity = now;
        self.online = true;
    }

    /// ActiveSession → NoSession. `last_activity` is left as history.
    pub(crate) fn end_session(&mut self) {
        self.active_session_id = None;
        self.online = false;
    }

    /// Records activity on the live session.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}

/// Generates a fresh session id: 32 hex characters (128 random bits).
pub(crate) fn generate_session_id() -> SessionId {
    let bytes: [u8; 16] = rand::rng().random();
    SessionId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn account() -> Account {
        Account::new(AccountId(1), "ana".into(), "hash".into(), t0())
    }

    fn sid(s: &str) -> SessionId {
        SessionId(s.into())
    }

    #[test]
    fn test_new_account_has_no_session_and_is_offline() {
        let acc = account();
        assert!(!acc.is_online());
        assert!(acc.active_session_id().is_none());
    }

    #[test]
    fn test_start_session_sets_id_online_and_activity() {
        let mut acc = account();
        let later = t0() + Duration::minutes(3);

        acc.start_session(sid("s1"), later);

        assert!(acc.is_online());
        assert!(acc.holds_session(&sid("s1")));
        assert_eq!(acc.active_session_id(), Some(&sid("s1")));
        assert_eq!(acc.last_activity(), later);
    }

    #[test]
    fn test_end_session_clears_id_and_online_together() {
        let mut acc = account();
        acc.start_session(sid("s1"), t0());

        acc.end_session();

        assert!(!acc.is_online());
        assert!(acc.active_session_id().is_none());
        assert!(!acc.holds_session(&sid("s1")));
    }

    #[test]
    fn test_is_idle_boundary_is_inclusive() {
        let mut acc = account();
        acc.start_session(sid("s1"), t0());
        let timeout = Duration::minutes(10);

        assert!(!acc.is_idle(t0() + Duration::minutes(9), timeout));
        assert!(acc.is_idle(t0() + Duration::minutes(10), timeout));
    }

    #[test]
    fn test_is_idle_false_without_session() {
        let acc = account();
        assert!(!acc.is_idle(t0() + Duration::days(1), Duration::minutes(10)));
    }

    #[test]
    fn test_touch_moves_last_activity() {
        let mut acc = account();
        acc.start_session(sid("s1"), t0());

        acc.touch(t0() + Duration::minutes(8));

        assert_eq!(acc.last_activity(), t0() + Duration::minutes(8));
        assert!(!acc.is_idle(t0() + Duration::minutes(17), Duration::minutes(10)));
    }

    #[test]
    fn test_generate_session_id_is_32_hex_chars_and_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
