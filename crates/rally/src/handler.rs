//! Per-connection handler: WebSocket upgrade, then request/response frames.
//!
//! The flow is:
//!   1. Upgrade the TCP stream to a WebSocket
//!   2. Loop: receive a frame → decode `ApiRequest` → dispatch → send
//!      `ApiResponse`
//!
//! A frame that does not decode gets a 400 response with id 0 and the
//! connection stays open. Silence longer than the idle timeout closes it.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rally_protocol::{ApiRequest, ApiResponse, Codec};
use rally_session::CredentialVerifier;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

use crate::RallyError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<V, C>(
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<ServerState<V, C>>,
) -> Result<(), RallyError>
where
    V: CredentialVerifier,
    C: Codec,
{
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut frames) = ws.split();
    tracing::debug!(%peer, "websocket connection opened");

    loop {
        let frame = match tokio::time::timeout(state.idle_timeout, frames.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                tracing::debug!(%peer, error = %e, "recv error");
                break;
            }
            Ok(None) => {
                tracing::debug!(%peer, "connection closed cleanly");
                break;
            }
            Err(_) => {
                tracing::info!(%peer, "connection idle, closing");
                // The peer may already be gone; nothing to do if this fails.
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        };

        let data = match frame {
            Message::Binary(data) => data.to_vec(),
            Message::Text(text) => text.as_bytes().to_vec(),
            Message::Close(_) => break,
            // Ping/pong are answered by tungstenite itself.
            _ => continue,
        };

        let response = match state.codec.decode::<ApiRequest>(&data) {
            Ok(request) => state.gateway.dispatch(request).await,
            Err(e) => {
                tracing::debug!(%peer, error = %e, "failed to decode request");
                let err = RallyError::from(e);
                ApiResponse::error(0, err.status(), err.to_body())
            }
        };

        let bytes = state.codec.encode(&response)?;
        sink.send(Message::Binary(bytes.into())).await?;
    }

    Ok(())
}
