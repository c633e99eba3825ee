//! Real-time collaboration hub.
//!
//! Two delivery paths reach subscribers of a note:
//!
//! - [`Hub::publish`] stores the notification in the update cache and sends it to
//!   every current subscriber before returning.
//! - The broadcast loop started by [`Hub::run`] polls the note store once per
//!   period and replays whatever appeared since its checkpoint. This path is
//!   at-most-once and lossy when the store errors.
//!
//! The paths are not ordered against each other. Clients sort on
//! `Notification::created` and keep the latest per note.

pub mod broadcast;
pub mod registry;
pub mod update_cache;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use notehub_domain::{
    Connection, ConnectionId, ConnectionMetrics, HubConfig, NoteId, NoteUpdateStore, Notification,
    TransportError,
};

pub use broadcast::{BroadcastLoop, SweepReport};
pub use registry::ConnectionRegistry;
pub use update_cache::UpdateCache;

use crate::HubError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub attempted: usize,
    pub delivered: usize,
}

#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    registry: Arc<ConnectionRegistry>,
    cache: Arc<UpdateCache>,
    store: Arc<dyn NoteUpdateStore>,
    metrics: Arc<dyn ConnectionMetrics>,
    config: HubConfig,
}

impl Hub {
    pub fn new(
        store: Arc<dyn NoteUpdateStore>,
        metrics: Arc<dyn ConnectionMetrics>,
        config: HubConfig,
    ) -> Self {
        Self {
            inner: Arc::new(HubInner {
                registry: Arc::new(ConnectionRegistry::new(metrics.clone())),
                cache: Arc::new(UpdateCache::new()),
                store,
                metrics,
                config,
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    pub fn cache(&self) -> &UpdateCache {
        &self.inner.cache
    }

    /// Registers a freshly established session for `note_id`.
    ///
    /// Fails only when the transport is already closed. A pending cached
    /// notification for the note is sent to the new subscriber right away.
    pub async fn subscribe(
        &self,
        connection: Arc<dyn Connection>,
        note_id: NoteId,
    ) -> Result<(), HubError> {
        self.inner
            .registry
            .subscribe(Arc::clone(&connection), note_id.clone())?;

        if let Some(pending) = self.inner.cache.get(&note_id) {
            if let Err(err) = connection.send(&pending).await {
                debug!(
                    connection_id = %connection.id(),
                    note_id = %note_id,
                    error = %err,
                    "catch-up send failed"
                );
            }
        }
        Ok(())
    }

    pub fn unsubscribe(&self, connection_id: ConnectionId) -> bool {
        self.inner.registry.unsubscribe(connection_id)
    }

    /// Caches `notification` and sends it to every subscriber of `note_id`
    /// except its originating connection.
    ///
    /// Send failures are logged and skipped. A connection found closed is
    /// dropped from the registry.
    pub async fn publish(&self, note_id: &NoteId, notification: Notification) -> PublishReport {
        self.inner.cache.set(
            note_id.clone(),
            notification.clone(),
            self.inner.config.cache_ttl,
        );

        let mut report = PublishReport::default();
        for connection in self.inner.registry.subscribers_of(note_id) {
            let connection_id = connection.id();
            if notification.origin_connection == Some(connection_id) {
                continue;
            }
            report.attempted += 1;
            match connection.send(&notification).await {
                Ok(()) => report.delivered += 1,
                Err(TransportError::Closed) => {
                    self.inner.metrics.record_send_failure();
                    self.inner.registry.unsubscribe(connection_id);
                }
                Err(err) => {
                    self.inner.metrics.record_send_failure();
                    warn!(
                        connection_id = %connection_id,
                        note_id = %note_id,
                        error = %err,
                        "publish send failed"
                    );
                }
            }
        }
        self.inner.metrics.record_publish(report.delivered);
        report
    }

    /// A broadcast loop whose checkpoint starts now. Run at most one per hub.
    pub fn broadcast_loop(&self) -> BroadcastLoop {
        BroadcastLoop::new(
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.metrics),
            &self.inner.config,
            Utc::now(),
        )
    }

    /// Starts the cache sweeper and drives the broadcast loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        self.inner
            .cache
            .start_sweeper(self.inner.config.cache_sweep_period, cancel.clone());
        self.broadcast_loop().run(cancel).await;
    }

    /// Cache teardown. Call after cancelling [`Hub::run`].
    pub fn shutdown(&self) {
        self.inner.cache.stop();
    }
}
