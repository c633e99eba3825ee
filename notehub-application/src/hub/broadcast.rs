use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use notehub_domain::{ConnectionMetrics, HubConfig, NoteId, NoteUpdateStore, Notification};

use super::registry::ConnectionRegistry;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub pairs: usize,
    pub delivered: usize,
    pub send_failures: usize,
    pub query_failures: usize,
}

/// Periodic backstop that replays store records to subscribers.
///
/// Delivery on this path is at-most-once and may lose records: a note whose
/// store query fails is skipped for the tick and the checkpoint still moves on.
/// The checkpoint advances by exactly one period per sweep, never to "now", so
/// records written while a sweep runs are picked up by the next one.
pub struct BroadcastLoop {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn NoteUpdateStore>,
    metrics: Arc<dyn ConnectionMetrics>,
    period: Duration,
    step: chrono::Duration,
    store_retries: u32,
    checkpoint: DateTime<Utc>,
}

impl BroadcastLoop {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn NoteUpdateStore>,
        metrics: Arc<dyn ConnectionMetrics>,
        config: &HubConfig,
        checkpoint: DateTime<Utc>,
    ) -> Self {
        let step = chrono::Duration::from_std(config.broadcast_period)
            .unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            registry,
            store,
            metrics,
            period: config.broadcast_period,
            step,
            store_retries: config.store_retries,
            checkpoint,
        }
    }

    pub fn checkpoint(&self) -> DateTime<Utc> {
        self.checkpoint
    }

    /// Sweeps once per period until `cancel` fires. Cancellation is only observed
    /// between sweeps. Returns the final checkpoint.
    pub async fn run(mut self, cancel: CancellationToken) -> DateTime<Utc> {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        info!(
            period_ms = self.period.as_millis() as u64,
            checkpoint = %self.checkpoint,
            "broadcast loop started"
        );
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.sweep().await;
                    debug!(
                        pairs = report.pairs,
                        delivered = report.delivered,
                        send_failures = report.send_failures,
                        query_failures = report.query_failures,
                        checkpoint = %self.checkpoint,
                        "broadcast sweep finished"
                    );
                }
            }
        }
        info!(checkpoint = %self.checkpoint, "broadcast loop stopped");
        self.checkpoint
    }

    /// One full pass over the registry, then the checkpoint moves one period forward.
    pub async fn sweep(&mut self) -> SweepReport {
        let entries = self.registry.snapshot();
        let mut report = SweepReport {
            pairs: entries.len(),
            ..SweepReport::default()
        };

        // One query per note, shared by all of its subscribers.
        let mut fetched: HashMap<NoteId, Option<Vec<Notification>>> = HashMap::new();
        for (connection, note_id) in entries {
            if !fetched.contains_key(&note_id) {
                let updates = self.fetch(&note_id).await;
                if updates.is_none() {
                    report.query_failures += 1;
                }
                fetched.insert(note_id.clone(), updates);
            }
            let Some(Some(updates)) = fetched.get(&note_id) else {
                continue;
            };

            let connection_id = connection.id();
            for notification in updates {
                if notification.origin_connection == Some(connection_id) {
                    continue;
                }
                match connection.send(notification).await {
                    Ok(()) => report.delivered += 1,
                    Err(err) => {
                        report.send_failures += 1;
                        self.metrics.record_send_failure();
                        debug!(
                            connection_id = %connection_id,
                            note_id = %note_id,
                            error = %err,
                            "broadcast send failed"
                        );
                        break;
                    }
                }
            }
        }

        self.checkpoint = self
            .checkpoint
            .checked_add_signed(self.step)
            .unwrap_or(self.checkpoint);
        self.metrics.record_sweep();
        report
    }

    async fn fetch(&self, note_id: &NoteId) -> Option<Vec<Notification>> {
        let mut attempt = 0;
        loop {
            match self.store.updates_since(note_id, self.checkpoint).await {
                Ok(updates) => return Some(updates),
                Err(err) => {
                    self.metrics.record_store_failure();
                    if attempt >= self.store_retries {
                        warn!(
                            note_id = %note_id,
                            since = %self.checkpoint,
                            error = %err,
                            "store query failed, skipping note for this tick"
                        );
                        return None;
                    }
                    attempt += 1;
                    debug!(note_id = %note_id, attempt, error = %err, "retrying store query");
                }
            }
        }
    }
}
