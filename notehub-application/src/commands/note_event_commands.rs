use tracing::debug;

use crate::{AppError, AppState};
use notehub_domain::{NoteEventRequest, NoteId, Notification, NotificationKind};

/// Edit usecase: persists the change first, then pushes it to live subscribers.
pub async fn record_note_event(
    state: &AppState,
    raw_note_id: &str,
    request: NoteEventRequest,
) -> Result<Notification, AppError> {
    let note_id = NoteId::parse(raw_note_id)
        .ok_or_else(|| AppError::BadRequest("note_id must not be empty".to_string()))?;
    let kind = NotificationKind::parse(&request.kind).ok_or_else(|| {
        AppError::BadRequest(format!("unsupported notification type '{}'", request.kind))
    })?;
    let actor = normalize_text(Some(request.actor))
        .ok_or_else(|| AppError::BadRequest("actor must not be empty".to_string()))?;

    let mut notification = Notification::new(kind, note_id.clone(), actor).with_payload(request.payload);
    notification.origin_connection = request.origin_connection;

    state
        .store
        .append_update(&notification)
        .await
        .map_err(AppError::Internal)?;

    let report = state.hub.publish(&note_id, notification.clone()).await;
    debug!(
        note_id = %note_id,
        kind = notification.kind.as_str(),
        attempted = report.attempted,
        delivered = report.delivered,
        "note event published"
    );
    Ok(notification)
}

pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
