use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use notehub_application::commands::{note_event_commands, session_commands};
use notehub_application::queries::note_queries;
use notehub_application::AppState;
use notehub_domain::{Connection, NoteId, Notification};

use crate::error::HttpError;
use crate::middleware::{authorize, authorize_with_query, parse_note_event};
use crate::ws::WsConnection;

#[derive(Deserialize)]
pub struct SessionQuery {
    pub actor: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Serialize)]
pub struct SubscriberCount {
    pub note_id: NoteId,
    pub subscribers: usize,
}

pub async fn note_session(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    upgrade: WebSocketUpgrade,
) -> Result<Response, HttpError> {
    if !authorize_with_query(&state.config, &headers, query.access_token.as_deref()) {
        return Err(HttpError::Unauthorized);
    }
    let note_id = NoteId::parse(&note_id)
        .ok_or_else(|| HttpError::BadRequest("note_id must not be empty".to_string()))?;
    let actor = query.actor;
    Ok(upgrade.on_upgrade(move |socket| run_session(socket, state, note_id, actor)))
}

async fn run_session(socket: WebSocket, state: AppState, note_id: NoteId, actor: Option<String>) {
    let connection = WsConnection::start(socket);
    let shared: Arc<dyn Connection> = connection.clone();
    if let Err(err) =
        session_commands::open_session(&state, shared, note_id.clone(), actor.clone()).await
    {
        warn!(connection_id = %connection.id(), note_id = %note_id, error = %err, "session rejected");
        connection.close().await;
        return;
    }
    info!(connection_id = %connection.id(), note_id = %note_id, "websocket subscribed");

    connection.closed().await;
    session_commands::close_session(&state, &*connection, note_id, actor).await;
}

pub async fn post_note_event(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Notification>), HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let request = parse_note_event(&headers, &body).map_err(|err| {
        warn!(note_id = %note_id, error = %err, "note event parse failed");
        HttpError::BadRequest(err.to_string())
    })?;
    let stored = note_event_commands::record_note_event(&state, &note_id, request).await?;
    Ok((StatusCode::ACCEPTED, Json(stored)))
}

pub async fn latest_notification(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Notification>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let notification = note_queries::latest_notification(&state, &note_id)?;
    Ok(Json(notification))
}

pub async fn list_subscribers(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SubscriberCount>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let (note_id, subscribers) = note_queries::subscriber_count(&state, &note_id)?;
    Ok(Json(SubscriberCount {
        note_id,
        subscribers,
    }))
}
