//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::{FutureExt, SinkExt, StreamExt};
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::dispatch::Dispatcher;
use crate::ids::ClientId;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};
use crate::registry::SessionRegistry;

/// Per-connection settings.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionConfig {
    /// Outbound queue capacity.
    pub max_send_queue: usize,
    /// Interval between server Ping frames.
    pub ping_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_send_queue: 256,
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Unregisters its client exactly once, however the session ends.
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    client_id: ClientId,
}

impl SessionGuard {
    /// Guard an already registered client.
    pub fn new(registry: Arc<SessionRegistry>, client_id: ClientId) -> Self {
        counter!(WS_CONNECTIONS_TOTAL).increment(1);
        gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
        Self {
            registry,
            client_id,
        }
    }

    /// The guarded client.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self.registry.unregister(&self.client_id);
        counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
        gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
        info!(client_id = %self.client_id, "client disconnected");
    }
}

/// Text payload of a frame. Binary frames count when they are UTF-8.
fn frame_text(msg: &Message) -> Option<String> {
    match msg {
        Message::Text(t) => Some(t.as_str().to_owned()),
        Message::Binary(data) => std::str::from_utf8(data).ok().map(str::to_owned),
        Message::Close(_) | Message::Ping(_) | Message::Pong(_) => None,
    }
}

/// Run a WebSocket session for a newly connected client.
///
/// 1. Registers the client with a bounded outbound queue
/// 2. Forwards queued replies and sends periodic Ping frames
/// 3. Dispatches each inbound text frame in order
/// 4. Unregisters the client when the transport closes or `shutdown` fires
///
/// There is no idle timeout: a session lasts until the transport ends.
#[instrument(skip_all, fields(client_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    dispatcher: Dispatcher,
    config: ConnectionConfig,
    shutdown: CancellationToken,
) {
    let client_id = ClientId::new();
    let _ = tracing::Span::current().record("client_id", client_id.as_str());
    let registry = Arc::clone(dispatcher.registry());

    let (send_tx, mut send_rx) = mpsc::channel::<String>(config.max_send_queue.max(1));
    if let Err(e) = registry.register(client_id.clone(), send_tx) {
        error!(error = %e, "could not register client");
        return;
    }
    let guard = SessionGuard::new(registry, client_id.clone());
    info!("client connected");

    let (mut ws_tx, mut ws_rx) = ws.split();

    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(config.ping_interval);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!("server shutting down");
                break;
            }
            frame = ws_rx.next() => frame,
        };
        let msg = match frame {
            Some(Ok(msg)) => msg,
            None => break,
            Some(Err(e)) => {
                debug!(error = %e, "transport error");
                break;
            }
        };
        if let Message::Close(_) = msg {
            debug!("client sent close frame");
            break;
        }
        let Some(text) = frame_text(&msg) else {
            continue;
        };

        let outcome = AssertUnwindSafe(dispatcher.dispatch(guard.client_id(), &text))
            .catch_unwind()
            .await;
        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(error = %e, "dropping message");
                continue;
            }
            Err(_) => {
                error!("message handler panicked");
                continue;
            }
        };

        if let Some(reply) = reply {
            match reply.to_json() {
                Ok(json) => {
                    if !dispatcher.registry().send_to(guard.client_id(), json) {
                        debug!("reply not queued");
                    }
                }
                Err(e) => error!(error = %e, "failed to encode reply"),
            }
        }
    }

    outbound.abort();
    drop(guard);
}
