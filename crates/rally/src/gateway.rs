//! Request gateway: routes an [`ApiRequest`] to the services and turns the
//! outcome into an [`ApiResponse`].
//!
//! The gateway knows nothing about sockets. The WebSocket server feeds it
//! one decoded request per frame, and tests call [`Gateway::dispatch`]
//! directly.
//!
//! Authenticated routes run, in order:
//!   1. `authenticate_bearer`: the access token is live and current
//!   2. the activity check: the account is online; `last_activity` = now
//!   3. the handler itself

use std::sync::Arc;

use rally_protocol::{
    AccountId, ApiRequest, ApiResponse, FriendAction, FriendTarget, FriendshipPatch,
    IdentityBody, LoginRequest, LogoutRequest, MessageBody, Method, RefreshRequest, StatusBody,
};
use rally_session::{
    AccountStore, ActivityTracker, AuthService, CredentialVerifier, Identity, RevocationLedger,
};
use rally_social::RelationshipService;
use rally_token::{Clock, TokenCodec};
use serde::Serialize;

use crate::{RallyError, ServerConfig};

pub const LOGIN_PATH: &str = "/api/users/login/";
pub const REFRESH_PATH: &str = "/api/users/token-refresh/";
pub const LOGOUT_PATH: &str = "/api/users/logout/";
pub const ME_PATH: &str = "/api/users/me/";
pub const FRIENDSHIP_PATH: &str = "/api/users/friendship/";
pub const FRIENDSHIP_REQUESTS_PATH: &str = "/api/users/friendship-requests/";
const FRIENDS_PREFIX: &str = "/api/users/friends/";
const FRIENDSHIP_STATUS_PREFIX: &str = "/api/users/friendship-status/";

// ---------------------------------------------------------------------------
// Routing table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Login,
    Refresh,
    Logout,
    Me,
    SendRequest,
    RemoveFriend,
    RespondRequest,
    IncomingRequests,
    Friends(AccountId),
    Status(AccountId),
}

impl Route {
    /// Matches the path first, then the method, so a known path with the
    /// wrong verb is a 405 rather than a 404.
    fn resolve(method: Method, path: &str) -> Result<Self, RallyError> {
        let candidates: &[(Method, Route)] = match path {
            LOGIN_PATH => &[(Method::Post, Route::Login)],
            REFRESH_PATH => &[(Method::Post, Route::Refresh)],
            LOGOUT_PATH => &[(Method::Post, Route::Logout)],
            ME_PATH => &[(Method::Get, Route::Me)],
            FRIENDSHIP_PATH => &[
                (Method::Post, Route::SendRequest),
                (Method::Delete, Route::RemoveFriend),
                (Method::Patch, Route::RespondRequest),
            ],
            FRIENDSHIP_REQUESTS_PATH => &[(Method::Get, Route::IncomingRequests)],
            _ => {
                return if let Some(id) = path_id(path, FRIENDS_PREFIX) {
                    only(method, path, Method::Get, Route::Friends(id))
                } else if let Some(id) = path_id(path, FRIENDSHIP_STATUS_PREFIX) {
                    only(method, path, Method::Get, Route::Status(id))
                } else {
                    Err(RallyError::RouteNotFound(path.to_string()))
                };
            }
        };

        candidates
            .iter()
            .find(|(allowed, _)| *allowed == method)
            .map(|(_, route)| *route)
            .ok_or_else(|| RallyError::MethodNotAllowed {
                method,
                path: path.to_string(),
            })
    }

    fn requires_identity(self) -> bool {
        !matches!(self, Route::Login | Route::Refresh | Route::Logout)
    }
}

fn only(method: Method, path: &str, allowed: Method, route: Route) -> Result<Route, RallyError> {
    if method == allowed {
        Ok(route)
    } else {
        Err(RallyError::MethodNotAllowed {
            method,
            path: path.to_string(),
        })
    }
}

/// `{prefix}{id}/` → `id`.
fn path_id(path: &str, prefix: &str) -> Option<AccountId> {
    path.strip_prefix(prefix)?
        .strip_suffix('/')?
        .parse()
        .ok()
        .map(AccountId)
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Owns the services and answers requests.
pub struct Gateway<V: CredentialVerifier> {
    auth: Arc<AuthService<V>>,
    social: Arc<RelationshipService>,
    activity: ActivityTracker,
}

impl<V: CredentialVerifier> Gateway<V> {
    pub fn new(
        auth: Arc<AuthService<V>>,
        social: Arc<RelationshipService>,
        activity: ActivityTracker,
    ) -> Self {
        Self {
            auth,
            social,
            activity,
        }
    }

    /// Wires a fresh ledger, token codec and services around an existing
    /// account store.
    pub fn from_config(
        config: &ServerConfig,
        accounts: Arc<AccountStore>,
        credentials: V,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = TokenCodec::new(config.signing_key.as_bytes(), Arc::clone(&clock));
        let auth = AuthService::new(
            Arc::clone(&accounts),
            Arc::new(RevocationLedger::new()),
            tokens,
            credentials,
            Arc::clone(&clock),
            config.session.clone(),
        );
        let social = RelationshipService::new(Arc::clone(&accounts), Arc::clone(&clock));
        let activity = ActivityTracker::new(accounts, clock, config.exempt_paths.clone());
        Self::new(Arc::new(auth), Arc::new(social), activity)
    }

    pub fn auth(&self) -> &Arc<AuthService<V>> {
        &self.auth
    }

    pub fn social(&self) -> &Arc<RelationshipService> {
        &self.social
    }

    /// Handles one request. Never fails: errors become error responses.
    pub async fn dispatch(&self, request: ApiRequest) -> ApiResponse {
        let id = request.id;
        match self.route(&request).await {
            Ok(response) => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status,
                    "request handled"
                );
                response
            }
            Err(err) => {
                let status = err.status();
                if status >= 500 {
                    tracing::error!(
                        method = %request.method,
                        path = %request.path,
                        error = %err,
                        "request failed"
                    );
                } else {
                    tracing::debug!(
                        method = %request.method,
                        path = %request.path,
                        status,
                        error = %err,
                        "request rejected"
                    );
                }
                ApiResponse::error(id, status, err.to_body())
            }
        }
    }

    async fn route(&self, request: &ApiRequest) -> Result<ApiResponse, RallyError> {
        let route = Route::resolve(request.method, &request.path)?;
        let id = request.id;

        let identity = if route.requires_identity() {
            Some(self.identify(request).await?)
        } else {
            None
        };

        match (route, identity) {
            (Route::Login, _) => {
                let body: LoginRequest = request.body_as()?;
                let pair = self.auth.login(&body.username, &body.password).await?;
                respond(id, 200, &pair)
            }
            (Route::Refresh, _) => {
                let body: RefreshRequest = request.body_as()?;
                let access = self.auth.refresh(&body.refresh_token).await?;
                respond(id, 200, &access)
            }
            (Route::Logout, _) => {
                let body: LogoutRequest = request.body_as()?;
                self.auth
                    .logout(request.header("authorization"), body.refresh_token.as_deref())
                    .await?;
                respond(id, 200, &MessageBody::new("Successfully logged out."))
            }
            (route, Some(me)) => self.handle_authenticated(id, request, route, me).await,
            (_, None) => Err(RallyError::RouteNotFound(request.path.clone())),
        }
    }

    async fn identify(&self, request: &ApiRequest) -> Result<Identity, RallyError> {
        let identity = self
            .auth
            .authenticate_bearer(request.header("authorization"))
            .await?;
        self.activity.record(&request.path, identity.account_id).await?;
        Ok(identity)
    }

    async fn handle_authenticated(
        &self,
        id: u64,
        request: &ApiRequest,
        route: Route,
        me: Identity,
    ) -> Result<ApiResponse, RallyError> {
        match route {
            Route::Me => respond(
                id,
                200,
                &IdentityBody {
                    user_id: me.account_id,
                    username: me.username,
                    session_id: me.session_id,
                },
            ),
            Route::SendRequest => {
                let FriendTarget { friend_id } = request.body_as::<FriendTarget>()?;
                self.social.request(me.account_id, friend_id).await?;
                respond(id, 201, &MessageBody::new("Friend request sent."))
            }
            Route::RemoveFriend => {
                let FriendTarget { friend_id } = request.body_as::<FriendTarget>()?;
                self.social.remove(me.account_id, friend_id).await?;
                respond(id, 200, &MessageBody::new("Friend removed."))
            }
            Route::RespondRequest => {
                let FriendshipPatch { friend_id, action } = request.body_as::<FriendshipPatch>()?;
                self.social.respond(me.account_id, friend_id, action).await?;
                let message = match action {
                    FriendAction::Accept => "Friend request accepted.",
                    FriendAction::Decline => "Friend request declined.",
                };
                respond(id, 200, &MessageBody::new(message))
            }
            Route::IncomingRequests => {
                let incoming = self.social.list_incoming(me.account_id).await;
                respond(id, 200, &incoming)
            }
            Route::Friends(user_id) => {
                let friends = self.social.list_friends(user_id).await?;
                respond(id, 200, &friends)
            }
            Route::Status(user_id) => {
                let status = self.social.status_of(me.account_id, user_id).await;
                respond(id, 200, &StatusBody { status })
            }
            Route::Login | Route::Refresh | Route::Logout => {
                Err(RallyError::RouteNotFound(request.path.clone()))
            }
        }
    }
}

fn respond<T: Serialize>(id: u64, status: u16, body: &T) -> Result<ApiResponse, RallyError> {
    Ok(ApiResponse::new(id, status, body)?)
}
