//! The authentication service: login, refresh, logout, validate.
//!
//! This is the state machine over (account, session):
//!
//! ```text
//!                login ok                    logout
//!   NoSession ─────────────→ ActiveSession ─────────→ NoSession
//!       ↑                      │    │
//!       │  login, idle ≥ 10m   │    │ login, idle < 10m
//!       └──────────────────────┘    └──→ ConcurrentSessionConflict
//! ```
//!
//! Every transition holds the account's exclusive guard from the first
//! read of the session slot to the last write, and performs all fallible
//! work (token signing) before the first write. A flow either applies all
//! of its side effects or none.

use std::sync::Arc;

use rally_protocol::{AccessToken, AccountId, SessionId, TokenPair};
use rally_token::{Claims, Clock, TokenCodec, TokenKind};

use crate::account::generate_session_id;
use crate::{
    AccountStore, AuthError, CredentialVerifier, RevocationLedger, RevokedToken, SessionConfig,
};

/// The identity behind a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: AccountId,
    pub username: String,
    pub session_id: SessionId,
}

/// Owns the session/token lifecycle.
///
/// Generic over the credential verifier so production uses Argon2 while
/// tests and other deployments can plug in their own check.
pub struct AuthService<V: CredentialVerifier> {
    accounts: Arc<AccountStore>,
    ledger: Arc<RevocationLedger>,
    tokens: TokenCodec,
    credentials: V,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl<V: CredentialVerifier> AuthService<V> {
    pub fn new(
        accounts: Arc<AccountStore>,
        ledger: Arc<RevocationLedger>,
        tokens: TokenCodec,
        credentials: V,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            accounts,
            ledger,
            tokens,
            credentials,
            clock,
            config,
        }
    }

    pub fn accounts(&self) -> &Arc<AccountStore> {
        &self.accounts
    }

    pub fn ledger(&self) -> &Arc<RevocationLedger> {
        &self.ledger
    }

    // -----------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------

    /// Verifies credentials and opens the account's single session.
    ///
    /// # Errors
    /// - [`AuthError::InvalidCredentials`]: unknown user or wrong password
    /// - [`AuthError::ConcurrentSessionConflict`]: a session exists and was
    ///   used less than `inactivity_timeout` ago
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some(account_id) = self.accounts.find_by_username(username).await else {
            tracing::debug!(username, "login rejected: unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        // The credential hash never changes inside this core, so the slow
        // password check runs before taking the account guard.
        let credential_hash = self
            .accounts
            .snapshot(account_id)
            .await
            .ok_or(AuthError::InvalidCredentials)?
            .credential_hash()
            .to_string();
        if !self.credentials.verify(password, &credential_hash).await? {
            tracing::debug!(%account_id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        // From here to the end, no other transition can touch this account.
        let mut account = self
            .accounts
            .lock(account_id)
            .await
            .ok_or(AuthError::InvalidCredentials)?;
        let now = self.clock.now();

        if let Some(previous) = account.active_session_id() {
            if !account.is_idle(now, self.config.inactivity_timeout) {
                tracing::debug!(%account_id, "login rejected: session already active");
                return Err(AuthError::ConcurrentSessionConflict(account_id));
            }
            // Idle too long: the old session is implicitly over and gets
            // replaced below.
            tracing::info!(%account_id, session_id = %previous, "idle session expired at login");
        }

        let session_id = generate_session_id();
        let access_token = self.tokens.issue(
            Claims::access(account_id, account.username(), session_id.clone()),
            self.config.access_token_ttl,
        )?;
        let refresh_token = self.tokens.issue(
            Claims::refresh(account_id, session_id.clone()),
            self.config.refresh_token_ttl,
        )?;

        account.start_session(session_id.clone(), now);
        tracing::info!(%account_id, %session_id, "session started");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    // -----------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------

    /// Mints a new access token for the session a refresh token belongs to.
    ///
    /// The refresh token itself is not rotated and `last_activity` is not
    /// touched. The new access token carries the account's *current*
    /// session id, read under the account guard.
    ///
    /// # Errors
    /// `Revoked`, `Expired`, `Malformed`, `WrongTokenType`,
    /// `AccountNotFound`, `SessionMismatch`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, AuthError> {
        if self.ledger.is_revoked(refresh_token).await {
            return Err(AuthError::Revoked);
        }
        let claims = self.tokens.decode(refresh_token)?;
        expect_kind(&claims, TokenKind::Refresh)?;

        let account = self
            .accounts
            .lock(claims.user_id)
            .await
            .ok_or(AuthError::AccountNotFound(claims.user_id))?;
        let session_id = account
            .active_session_id()
            .filter(|current| **current == claims.session_id)
            .cloned()
            .ok_or(AuthError::SessionMismatch)?;

        let access_token = self.tokens.issue(
            Claims::access(account.id(), account.username(), session_id),
            self.config.access_token_ttl,
        )?;
        tracing::debug!(account_id = %account.id(), "access token refreshed");
        Ok(AccessToken { access_token })
    }

    // -----------------------------------------------------------------
    // Logout
    // -----------------------------------------------------------------

    /// Ends the session and revokes both presented tokens.
    ///
    /// Only the refresh token is decoded. The access token is revoked as an
    /// opaque string, so logout still works after it has expired.
    ///
    /// Not idempotent: a second call with the same tokens fails with
    /// `Revoked`.
    ///
    /// # Errors
    /// `MissingToken`, `Revoked`, `Expired`, `Malformed`,
    /// `WrongTokenType`, `AccountNotFound`, `SessionMismatch`.
    pub async fn logout(
        &self,
        authorization: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let header = authorization.ok_or(AuthError::MissingToken("access token"))?;
        let refresh_token = refresh_token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken("refresh token"))?;
        let access_token = parse_bearer(header).ok_or(AuthError::MissingToken("access token"))?;

        if self.ledger.is_revoked(refresh_token).await {
            return Err(AuthError::Revoked);
        }
        let claims = self.tokens.decode(refresh_token)?;
        expect_kind(&claims, TokenKind::Refresh)?;

        let mut account = self
            .accounts
            .lock(claims.user_id)
            .await
            .ok_or(AuthError::AccountNotFound(claims.user_id))?;
        if !account.holds_session(&claims.session_id) {
            return Err(AuthError::SessionMismatch);
        }

        // Both writes below are infallible, and both happen under the
        // account guard: the session is either fully closed or untouched.
        let now = self.clock.now();
        let account_id = account.id();
        self.ledger
            .revoke_all([
                RevokedToken::new(access_token, TokenKind::Access, account_id, now),
                RevokedToken::new(refresh_token, TokenKind::Refresh, account_id, now),
            ])
            .await;
        account.end_session();

        tracing::info!(%account_id, session_id = %claims.session_id, "session ended by logout");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Validate
    // -----------------------------------------------------------------

    /// Full check of an access token: not revoked, well-formed, unexpired,
    /// an access token, and bound to the account's live session.
    ///
    /// Use this instead of decoding tokens ad hoc whenever live-session
    /// freshness matters.
    pub async fn validate(&self, access_token: &str) -> Result<Identity, AuthError> {
        if self.ledger.is_revoked(access_token).await {
            return Err(AuthError::Revoked);
        }
        let claims = self.tokens.decode(access_token)?;
        expect_kind(&claims, TokenKind::Access)?;

        let account = self
            .accounts
            .snapshot(claims.user_id)
            .await
            .ok_or(AuthError::AccountNotFound(claims.user_id))?;
        if !account.holds_session(&claims.session_id) {
            return Err(AuthError::SessionMismatch);
        }

        Ok(Identity {
            account_id: account.id(),
            username: account.username().to_string(),
            session_id: claims.session_id,
        })
    }

    /// Parses an `Authorization` header and validates the bearer token.
    ///
    /// # Errors
    /// [`AuthError::MissingToken`] when the header is absent or not
    /// `Bearer <token>`; otherwise as [`validate`](Self::validate).
    pub async fn authenticate_bearer(
        &self,
        authorization: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let token = authorization
            .and_then(parse_bearer)
            .ok_or(AuthError::MissingToken("access token"))?;
        self.validate(token).await
    }
}

/// Extracts the token from `Bearer <token>`.
///
/// The scheme is case-insensitive; exactly one space separates it from a
/// non-empty token.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

fn expect_kind(claims: &Claims, expected: TokenKind) -> Result<(), AuthError> {
    if claims.kind != expected {
        return Err(AuthError::WrongTokenType {
            expected,
            found: claims.kind,
        });
    }
    Ok(())
}
