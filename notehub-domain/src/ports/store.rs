use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::Notification;
use crate::value_objects::NoteId;

/// Durable record of note changes. Other processes may write to it too.
#[async_trait]
pub trait NoteUpdateStore: Send + Sync {
    /// Notifications for `note_id` with `created > since`, ordered by `created`.
    async fn updates_since(
        &self,
        note_id: &NoteId,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Notification>>;

    async fn append_update(&self, notification: &Notification) -> anyhow::Result<()>;

    async fn ping(&self) -> anyhow::Result<()>;
}
