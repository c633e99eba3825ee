use crate::{AppError, AppState};
use notehub_domain::{NoteId, Notification};

pub fn latest_notification(state: &AppState, raw_note_id: &str) -> Result<Notification, AppError> {
    let note_id = parse_note_id(raw_note_id)?;
    state.hub.cache().get(&note_id).ok_or(AppError::NotFound)
}

pub fn subscriber_count(state: &AppState, raw_note_id: &str) -> Result<(NoteId, usize), AppError> {
    let note_id = parse_note_id(raw_note_id)?;
    let count = state.hub.registry().subscriber_count(&note_id);
    Ok((note_id, count))
}

fn parse_note_id(raw: &str) -> Result<NoteId, AppError> {
    NoteId::parse(raw).ok_or_else(|| AppError::BadRequest("note_id must not be empty".to_string()))
}
