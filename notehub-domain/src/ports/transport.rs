use async_trait::async_trait;
use thiserror::Error;

use crate::entities::Notification;
use crate::value_objects::ConnectionId;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("transport error: {0}")]
    Io(String),
}

/// A persistent bidirectional channel with one peer.
///
/// Framing belongs to the implementation; the hub only sends notifications,
/// waits on inbound traffic to detect closure, and closes.
#[async_trait]
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    fn is_open(&self) -> bool;

    async fn send(&self, notification: &Notification) -> Result<(), TransportError>;

    /// Waits for the next inbound frame. Any error, including a peer close, ends the session.
    async fn recv(&self) -> Result<(), TransportError>;

    async fn close(&self);
}
