use std::sync::Arc;

use tracing::info;

use crate::commands::note_event_commands::normalize_text;
use crate::{AppState, HubError};
use notehub_domain::{Connection, NoteId, Notification, NotificationKind};

/// Subscribes an authenticated session and tells the other viewers who joined.
pub async fn open_session(
    state: &AppState,
    connection: Arc<dyn Connection>,
    note_id: NoteId,
    actor: Option<String>,
) -> Result<(), HubError> {
    let connection_id = connection.id();
    state.hub.subscribe(connection, note_id.clone()).await?;

    if let Some(actor) = normalize_text(actor) {
        info!(connection_id = %connection_id, note_id = %note_id, actor = %actor, "session opened");
        let notification =
            Notification::new(NotificationKind::Opened, note_id.clone(), actor).with_origin(connection_id);
        state.hub.publish(&note_id, notification).await;
    }
    Ok(())
}

/// Drops the session from the hub and tells the remaining viewers who left.
pub async fn close_session(
    state: &AppState,
    connection: &dyn Connection,
    note_id: NoteId,
    actor: Option<String>,
) {
    let connection_id = connection.id();
    state.hub.unsubscribe(connection_id);
    connection.close().await;

    if let Some(actor) = normalize_text(actor) {
        info!(connection_id = %connection_id, note_id = %note_id, actor = %actor, "session closed");
        let notification =
            Notification::new(NotificationKind::Closed, note_id.clone(), actor).with_origin(connection_id);
        state.hub.publish(&note_id, notification).await;
    }
}
