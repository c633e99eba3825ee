use thiserror::Error;

use notehub_domain::ConnectionId;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// The only hub failure surfaced to callers; the client must reconnect.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("connection {0} is already closed")]
    ConnectionClosed(ConnectionId),
}
