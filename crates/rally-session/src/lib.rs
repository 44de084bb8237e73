//! Account session management for Rally.
//!
//! This crate owns the session/token lifecycle of the identity core:
//!
//! 1. **Credentials**: checking who someone is ([`CredentialVerifier`])
//! 2. **Session store**: one session slot per account ([`AccountStore`])
//! 3. **Revocation**: tokens that must never be trusted again
//!    ([`RevocationLedger`])
//! 4. **Authentication**: login / refresh / logout / validate
//!    ([`AuthService`])
//! 5. **Activity**: last-seen bookkeeping on every request
//!    ([`ActivityTracker`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway (above)        ← turns requests into service calls
//!     ↕
//! Session Layer (this)   ← who is logged in, with which session
//!     ↕
//! Token Layer (below)    ← signs and verifies claim sets
//! ```
//!
//! # Concurrency
//!
//! Every read-then-write on an account's session fields happens while
//! holding that account's exclusive guard ([`AccountStore::lock`]).
//! Different accounts never contend with each other.

mod account;
mod activity;
mod config;
mod credentials;
mod error;
mod ledger;
mod service;
mod store;

pub use account::Account;
pub use activity::{ActivityOutcome, ActivityTracker, ExemptPaths};
pub use config::SessionConfig;
pub use credentials::{Argon2Credentials, CredentialVerifier};
pub use error::AuthError;
pub use ledger::{RevocationLedger, RevokedToken};
pub use service::{AuthService, Identity, parse_bearer};
pub use store::AccountStore;
