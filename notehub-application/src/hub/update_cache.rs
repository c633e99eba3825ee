use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use notehub_domain::{NoteId, Notification};

struct CacheEntry {
    notification: Notification,
    expires_at: Instant,
}

/// Latest pending notification per note, dropped after a TTL.
///
/// Bursts of edits on one note collapse into the newest one.
pub struct UpdateCache {
    entries: DashMap<NoteId, CacheEntry>,
    sweeper_started: AtomicBool,
    shutdown: CancellationToken,
}

impl Default for UpdateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            sweeper_started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn set(&self, note_id: NoteId, notification: Notification, ttl: Duration) {
        self.entries.insert(
            note_id,
            CacheEntry {
                notification,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Expired entries read as absent even if the sweeper has not run yet.
    pub fn get(&self, note_id: &NoteId) -> Option<Notification> {
        let now = Instant::now();
        {
            let entry = self.entries.get(note_id)?;
            if entry.expires_at > now {
                return Some(entry.notification.clone());
            }
        }
        self.entries
            .remove_if(note_id, |_, entry| entry.expires_at <= now);
        None
    }

    pub fn delete(&self, note_id: &NoteId) -> bool {
        self.entries.remove(note_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry and returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.expires_at > now;
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }

    /// Spawns the expiry sweeper. Only the first call starts a task.
    pub fn start_sweeper(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if self.sweeper_started.swap(true, Ordering::SeqCst) {
            return None;
        }
        let cache = Arc::clone(self);
        let shutdown = self.shutdown.clone();
        Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            debug!(purged, "update cache swept");
                        }
                    }
                }
            }
            debug!("update cache sweeper stopped");
        }))
    }

    /// Stops the sweeper. Safe to call more than once or without a running sweeper.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}
