use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use notehub_domain::{NoteId, NoteUpdateStore, Notification};

/// In-process update log, one bounded queue per note kept sorted by `created`.
/// A note's queue is kept for the life of the process once written.
pub struct MemoryNoteUpdateStore {
    updates: RwLock<HashMap<NoteId, VecDeque<Notification>>>,
    max_per_note: usize,
}

impl MemoryNoteUpdateStore {
    pub fn new(max_per_note: usize) -> Self {
        Self {
            updates: RwLock::new(HashMap::new()),
            max_per_note: max_per_note.max(1),
        }
    }

    pub async fn len(&self, note_id: &NoteId) -> usize {
        self.updates
            .read()
            .await
            .get(note_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl NoteUpdateStore for MemoryNoteUpdateStore {
    async fn updates_since(
        &self,
        note_id: &NoteId,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Notification>> {
        let updates = self.updates.read().await;
        let Some(queue) = updates.get(note_id) else {
            return Ok(Vec::new());
        };
        let start = queue.partition_point(|item| item.created <= since);
        Ok(queue.range(start..).cloned().collect())
    }

    async fn append_update(&self, notification: &Notification) -> anyhow::Result<()> {
        let mut updates = self.updates.write().await;
        let queue = updates.entry(notification.note_id.clone()).or_default();
        // Writers from other processes may land slightly out of order.
        let position = queue.partition_point(|item| item.created <= notification.created);
        queue.insert(position, notification.clone());
        while queue.len() > self.max_per_note {
            queue.pop_front();
        }
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
