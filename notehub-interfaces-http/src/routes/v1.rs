use axum::routing::{get, post};
use axum::Router;

use notehub_application::AppState;

use crate::handlers::{note_handlers, ops_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/notes/:note_id/ws", get(note_handlers::note_session))
        .route(
            "/v1/notes/:note_id/events",
            post(note_handlers::post_note_event),
        )
        .route(
            "/v1/notes/:note_id/latest",
            get(note_handlers::latest_notification),
        )
        .route(
            "/v1/notes/:note_id/subscribers",
            get(note_handlers::list_subscribers),
        )
        .route("/v1/ops/health/live", get(ops_handlers::health_live))
        .route("/v1/ops/health/ready", get(ops_handlers::health_ready))
        .route(
            "/v1/ops/metrics/prometheus",
            get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
