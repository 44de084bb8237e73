//! # Rally
//!
//! Identity and friendship backend for multiplayer web games.
//!
//! Rally enforces one live session per account, issues and revokes access
//! and refresh tokens, tracks activity, and keeps a friendship graph with
//! a request / accept / decline lifecycle. The services live in the
//! `rally-*` crates; this crate wires them behind a request gateway and a
//! WebSocket server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rally::prelude::*;
//!
//! # async fn start() -> Result<(), RallyError> {
//! let config = ServerConfig::from_env()?;
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let accounts = Arc::new(AccountStore::new(Arc::clone(&clock)));
//! let gateway = Gateway::from_config(&config, accounts, Argon2Credentials::new(), clock);
//!
//! let server = RallyServerBuilder::from_config(&config).build(gateway).await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
pub mod gateway;
mod handler;
pub mod logging;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::RallyError;
pub use gateway::Gateway;
pub use server::{RallyServer, RallyServerBuilder};

/// Re-exports everything a server binary or client test typically needs.
pub mod prelude {
    pub use crate::config::{ConfigError, ServerConfig};
    pub use crate::error::RallyError;
    pub use crate::gateway::Gateway;
    pub use crate::server::{RallyServer, RallyServerBuilder};

    pub use rally_protocol::{
        AccessToken, AccountId, AccountSummary, ApiRequest, ApiResponse, Codec, ErrorBody,
        FriendAction, FriendEntry, FriendTarget, FriendshipPatch, IdentityBody, IncomingRequest,
        JsonCodec, LoginRequest, LogoutRequest, MessageBody, Method, RefreshRequest,
        RelationStatus, SessionId, StatusBody, TokenPair,
    };
    pub use rally_session::{
        AccountStore, ActivityTracker, Argon2Credentials, AuthError, AuthService,
        CredentialVerifier, ExemptPaths, Identity, RevocationLedger, SessionConfig,
    };
    pub use rally_social::{RelationshipService, SocialError};
    pub use rally_token::{Clock, ManualClock, SystemClock, TokenCodec};
}
