use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use notehub_domain::{Connection, ConnectionId, Notification, TransportError};

/// A hub connection backed by an upgraded WebSocket.
///
/// Outbound frames go through a writer task so `send` never waits on the
/// socket. The read half is only polled by `recv`, which the registry's
/// liveness watcher drives.
pub struct WsConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Message>,
    inbound: Mutex<SplitStream<WebSocket>>,
    closed: CancellationToken,
}

impl WsConnection {
    pub fn start(socket: WebSocket) -> Arc<Self> {
        let (sink, stream) = socket.split();
        let (outbound, rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();
        let id = ConnectionId::new();
        tokio::spawn(write_frames(id, sink, rx, closed.clone()));
        Arc::new(Self {
            id,
            outbound,
            inbound: Mutex::new(stream),
            closed,
        })
    }

    /// Resolves once either side has closed the socket.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}

async fn write_frames(
    id: ConnectionId,
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
    closed: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            next = rx.recv() => {
                let Some(message) = next else {
                    break;
                };
                if let Err(err) = sink.send(message).await {
                    debug!(connection_id = %id, error = %err, "websocket write failed");
                    closed.cancel();
                    break;
                }
            }
        }
    }
    let _ = sink.close().await;
}

#[async_trait]
impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_open(&self) -> bool {
        !self.closed.is_cancelled() && !self.outbound.is_closed()
    }

    async fn send(&self, notification: &Notification) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        let text = serde_json::to_string(notification)
            .map_err(|err| TransportError::Encode(err.to_string()))?;
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    /// Waits for the next client frame. Client frames carry no meaning beyond
    /// liveness; a close frame or read error ends the connection.
    async fn recv(&self) -> Result<(), TransportError> {
        let mut inbound = self.inbound.lock().await;
        let frame = tokio::select! {
            _ = self.closed.cancelled() => return Err(TransportError::Closed),
            frame = inbound.next() => frame,
        };
        match frame {
            Some(Ok(Message::Close(_))) | None => {
                self.closed.cancel();
                Err(TransportError::Closed)
            }
            Some(Ok(_)) => Ok(()),
            Some(Err(err)) => {
                self.closed.cancel();
                Err(TransportError::Io(err.to_string()))
            }
        }
    }

    async fn close(&self) {
        self.closed.cancel();
    }
}
