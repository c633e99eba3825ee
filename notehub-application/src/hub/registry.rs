use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use notehub_domain::{Connection, ConnectionId, ConnectionMetrics, NoteId};

use crate::HubError;

struct RegistryEntry {
    connection: Arc<dyn Connection>,
    note_id: NoteId,
    watch: CancellationToken,
}

/// Live connections and the note each one follows, keyed by connection.
/// Per-note lookups scan all entries.
pub struct ConnectionRegistry {
    entries: DashMap<ConnectionId, RegistryEntry>,
    metrics: Arc<dyn ConnectionMetrics>,
}

impl ConnectionRegistry {
    pub fn new(metrics: Arc<dyn ConnectionMetrics>) -> Self {
        Self {
            entries: DashMap::new(),
            metrics,
        }
    }

    /// Registers `connection` for `note_id` and starts its liveness watcher.
    ///
    /// A connection that is already registered is moved to the new note; it
    /// keeps its watcher and is not counted twice.
    pub fn subscribe(
        self: &Arc<Self>,
        connection: Arc<dyn Connection>,
        note_id: NoteId,
    ) -> Result<(), HubError> {
        let connection_id = connection.id();
        if !connection.is_open() {
            return Err(HubError::ConnectionClosed(connection_id));
        }

        let watch = match self.entries.entry(connection_id) {
            Entry::Occupied(mut occupied) => {
                let previous = std::mem::replace(&mut occupied.get_mut().note_id, note_id.clone());
                debug!(
                    connection_id = %connection_id,
                    from = %previous,
                    to = %note_id,
                    "connection moved to another note"
                );
                return Ok(());
            }
            Entry::Vacant(vacant) => {
                let watch = CancellationToken::new();
                vacant.insert(RegistryEntry {
                    connection: Arc::clone(&connection),
                    note_id: note_id.clone(),
                    watch: watch.clone(),
                });
                watch
            }
        };

        self.metrics.increase_connections();
        info!(connection_id = %connection_id, note_id = %note_id, "subscriber registered");
        spawn_liveness_watcher(Arc::downgrade(self), connection, watch);
        Ok(())
    }

    /// Removes the connection. Returns false when it was not registered.
    pub fn unsubscribe(&self, connection_id: ConnectionId) -> bool {
        let Some((_, entry)) = self.entries.remove(&connection_id) else {
            return false;
        };
        entry.watch.cancel();
        self.metrics.decrease_connections();
        info!(
            connection_id = %connection_id,
            note_id = %entry.note_id,
            "subscriber removed"
        );
        true
    }

    /// Copy of the current entries. Mutation after the copy is taken is not reflected.
    pub fn snapshot(&self) -> Vec<(Arc<dyn Connection>, NoteId)> {
        self.entries
            .iter()
            .map(|entry| (Arc::clone(&entry.connection), entry.note_id.clone()))
            .collect()
    }

    /// Visits a snapshot, so `f` may itself subscribe or unsubscribe.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<dyn Connection>, &NoteId),
    {
        for (connection, note_id) in self.snapshot() {
            f(&connection, &note_id);
        }
    }

    pub fn subscribers_of(&self, note_id: &NoteId) -> Vec<Arc<dyn Connection>> {
        self.entries
            .iter()
            .filter(|entry| entry.note_id == *note_id)
            .map(|entry| Arc::clone(&entry.connection))
            .collect()
    }

    pub fn subscriber_count(&self, note_id: &NoteId) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.note_id == *note_id)
            .count()
    }

    pub fn note_of(&self, connection_id: ConnectionId) -> Option<NoteId> {
        self.entries
            .get(&connection_id)
            .map(|entry| entry.note_id.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn spawn_liveness_watcher(
    registry: Weak<ConnectionRegistry>,
    connection: Arc<dyn Connection>,
    watch: CancellationToken,
) {
    tokio::spawn(async move {
        let connection_id = connection.id();
        loop {
            tokio::select! {
                biased;
                _ = watch.cancelled() => return,
                result = connection.recv() => {
                    if let Err(err) = result {
                        debug!(connection_id = %connection_id, error = %err, "connection read ended");
                        break;
                    }
                }
            }
        }
        if let Some(registry) = registry.upgrade() {
            registry.unsubscribe(connection_id);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::testing::{eventually, note, RecordingConnection};
    use crate::Metrics;

    fn registry() -> (Arc<ConnectionRegistry>, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::default());
        (Arc::new(ConnectionRegistry::new(metrics.clone())), metrics)
    }

    #[tokio::test]
    async fn subscribe_counts_each_connection_once() {
        let (registry, metrics) = registry();
        let conn = RecordingConnection::new();

        registry.subscribe(conn.clone(), note("a")).expect("subscribe");
        registry.subscribe(conn.clone(), note("b")).expect("resubscribe");

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.note_of(conn.id()), Some(note("b")));
        assert_eq!(metrics.active_connections(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let (registry, metrics) = registry();
        let conn = RecordingConnection::new();
        registry.subscribe(conn.clone(), note("a")).expect("subscribe");

        assert!(registry.unsubscribe(conn.id()));
        assert!(!registry.unsubscribe(conn.id()));
        assert!(registry.is_empty());
        assert_eq!(metrics.active_connections(), 0);
    }

    #[tokio::test]
    async fn cancelled_watcher_never_reads_after_resubscribe() {
        let (registry, metrics) = registry();
        let conn = RecordingConnection::new();

        // the first watcher is cancelled before it is ever polled
        registry.subscribe(conn.clone(), note("a")).expect("subscribe");
        assert!(registry.unsubscribe(conn.id()));
        registry.subscribe(conn.clone(), note("a")).expect("resubscribe");

        assert!(eventually(|| conn.reads() >= 1).await);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(conn.reads(), 1);
        assert_eq!(registry.note_of(conn.id()), Some(note("a")));
        assert_eq!(metrics.active_connections(), 1);
    }

    #[tokio::test]
    async fn closed_connection_is_rejected() {
        let (registry, metrics) = registry();
        let conn = RecordingConnection::new();
        conn.drop_peer();

        let err = registry
            .subscribe(conn.clone(), note("a"))
            .expect_err("closed connection");
        assert!(matches!(err, HubError::ConnectionClosed(id) if id == conn.id()));
        assert!(registry.is_empty());
        assert_eq!(metrics.active_connections(), 0);
    }

    #[tokio::test]
    async fn peer_close_removes_entry_through_watcher() {
        let (registry, metrics) = registry();
        let leaving = RecordingConnection::new();
        let staying = RecordingConnection::new();
        registry.subscribe(leaving.clone(), note("a")).expect("subscribe");
        registry.subscribe(staying.clone(), note("a")).expect("subscribe");

        leaving.drop_peer();

        assert!(eventually(|| registry.len() == 1).await);
        let mut visited = Vec::new();
        registry.for_each(|conn, _| visited.push(conn.id()));
        assert_eq!(visited, vec![staying.id()]);
        assert_eq!(metrics.active_connections(), 1);
    }

    #[tokio::test]
    async fn for_each_tolerates_removal_during_iteration() {
        let (registry, _) = registry();
        let conns: Vec<_> = (0..8).map(|_| RecordingConnection::new()).collect();
        for conn in &conns {
            registry.subscribe(conn.clone(), note("a")).expect("subscribe");
        }

        let mut visited = 0;
        registry.for_each(|conn, _| {
            registry.unsubscribe(conn.id());
            visited += 1;
        });

        assert_eq!(visited, conns.len());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn subscriber_count_is_per_note() {
        let (registry, _) = registry();
        for raw in ["a", "a", "b"] {
            registry
                .subscribe(RecordingConnection::new(), note(raw))
                .expect("subscribe");
        }
        assert_eq!(registry.subscriber_count(&note("a")), 2);
        assert_eq!(registry.subscribers_of(&note("b")).len(), 1);
        assert_eq!(registry.subscriber_count(&note("c")), 0);
    }
}
