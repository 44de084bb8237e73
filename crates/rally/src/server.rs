//! `RallyServer` builder and accept loop.
//!
//! The server ties the layers together: TCP → WebSocket → codec → gateway.
//! Every accepted connection gets its own task; all tasks share one
//! [`ServerState`] through an `Arc`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rally_protocol::{Codec, JsonCodec};
use rally_session::CredentialVerifier;
use tokio::net::TcpListener;

use crate::handler::handle_connection;
use crate::{Gateway, RallyError, ServerConfig};

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<V: CredentialVerifier, C: Codec> {
    pub(crate) gateway: Gateway<V>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Rally server.
///
/// # Example
///
/// ```rust,ignore
/// use rally::prelude::*;
///
/// let server = RallyServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(gateway)
///     .await?;
/// server.run().await
/// ```
pub struct RallyServerBuilder {
    bind_addr: String,
    idle_timeout: Duration,
}

impl RallyServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout: Duration::from_secs(300),
        }
    }

    /// Takes the bind address and idle timeout from a [`ServerConfig`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            idle_timeout: config.idle_timeout,
        }
    }

    /// Sets the address to bind to. Port 0 picks a free port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Closes connections that send nothing for this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener, using [`JsonCodec`] for frames.
    pub async fn build<V: CredentialVerifier>(
        self,
        gateway: Gateway<V>,
    ) -> Result<RallyServer<V, JsonCodec>, RallyError> {
        self.build_with_codec(gateway, JsonCodec).await
    }

    /// Binds the listener with a custom frame codec.
    pub async fn build_with_codec<V: CredentialVerifier, C: Codec>(
        self,
        gateway: Gateway<V>,
        codec: C,
    ) -> Result<RallyServer<V, C>, RallyError> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");

        let state = Arc::new(ServerState {
            gateway,
            codec,
            idle_timeout: self.idle_timeout,
        });
        Ok(RallyServer { listener, state })
    }
}

impl Default for RallyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Rally server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct RallyServer<V: CredentialVerifier, C: Codec> {
    listener: TcpListener,
    state: Arc<ServerState<V, C>>,
}

impl<V: CredentialVerifier, C: Codec> RallyServer<V, C> {
    /// Creates a new builder.
    pub fn builder() -> RallyServerBuilder {
        RallyServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The gateway behind this server, e.g. for seeding accounts.
    pub fn gateway(&self) -> &Gateway<V> {
        &self.state.gateway
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RallyError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes. Connections that
    /// are already open keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), RallyError>
    where
        F: Future<Output = ()> + Send,
    {
        tracing::info!("rally server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, state).await {
                                tracing::debug!(%peer, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
    }
}
