use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use notehub_application::commands::note_event_commands;
use notehub_application::{AppState, Hub, Metrics};
use notehub_domain::{
    HubConfig, NoteEventRequest, NoteId, Notification, NotificationKind, RuntimeConfig,
};
use notehub_infrastructure::MemoryNoteUpdateStore;
use notehub_interfaces_http::build_router;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn state() -> AppState {
    let hub_config = HubConfig {
        broadcast_period: Duration::from_millis(100),
        cache_ttl: Duration::from_secs(5),
        cache_sweep_period: Duration::from_secs(5),
        store_retries: 0,
    };
    let store = Arc::new(MemoryNoteUpdateStore::new(64));
    let metrics = Arc::new(Metrics::default());
    AppState {
        config: RuntimeConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            api_token: None,
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 5,
            hub: hub_config.clone(),
        },
        store: store.clone(),
        hub: Hub::new(store, metrics.clone(), hub_config),
        metrics,
    }
}

async fn serve(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, build_router(state))
            .await
            .expect("serve");
    });
    format!("ws://{}", addr)
}

async fn wait_for_subscribers(state: &AppState, note_id: &NoteId, count: usize) {
    for _ in 0..200 {
        if state.hub.registry().subscriber_count(note_id) == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} subscribers on {note_id}");
}

async fn next_notification(client: &mut Client) -> Notification {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("frame ok");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("notification json");
        }
    }
}

#[tokio::test]
async fn subscribers_see_joins_updates_and_leaves() {
    let state = state();
    let base = serve(state.clone()).await;
    let note_id = NoteId("doc-1".to_string());

    let (mut alice, _) = connect_async(format!("{base}/v1/notes/doc-1/ws?actor=alice"))
        .await
        .expect("alice connects");
    wait_for_subscribers(&state, &note_id, 1).await;

    let (mut bob, _) = connect_async(format!("{base}/v1/notes/doc-1/ws?actor=bob"))
        .await
        .expect("bob connects");
    wait_for_subscribers(&state, &note_id, 2).await;

    let joined = next_notification(&mut alice).await;
    assert_eq!(joined.kind, NotificationKind::Opened);
    assert_eq!(joined.actor, "bob");

    let request = NoteEventRequest {
        kind: "updated".to_string(),
        actor: "carol".to_string(),
        payload: serde_json::json!({ "rev": 7 }),
        origin_connection: None,
    };
    note_event_commands::record_note_event(&state, "doc-1", request)
        .await
        .expect("record");

    let update = next_notification(&mut alice).await;
    assert_eq!(update.kind, NotificationKind::Updated);
    assert_eq!(update.payload["rev"], 7);

    // bob may first see alice's cached join as catch-up
    let mut seen_by_bob = next_notification(&mut bob).await;
    while seen_by_bob.kind != NotificationKind::Updated {
        seen_by_bob = next_notification(&mut bob).await;
    }
    assert_eq!(seen_by_bob.actor, "carol");

    bob.close(None).await.expect("bob closes");
    wait_for_subscribers(&state, &note_id, 1).await;
    let left = next_notification(&mut alice).await;
    assert_eq!(left.kind, NotificationKind::Closed);
    assert_eq!(left.actor, "bob");
    assert_eq!(state.metrics.active_connections(), 1);

    alice.send(Message::Close(None)).await.expect("alice closes");
    wait_for_subscribers(&state, &note_id, 0).await;
}

#[tokio::test]
async fn upgrade_requires_token_when_configured() {
    let mut state = state();
    state.config.api_token = Some("secret".to_string());
    let base = serve(state.clone()).await;

    assert!(connect_async(format!("{base}/v1/notes/doc-1/ws")).await.is_err());

    let (_client, _) = connect_async(format!("{base}/v1/notes/doc-1/ws?access_token=secret"))
        .await
        .expect("token accepted");
    wait_for_subscribers(&state, &NoteId("doc-1".to_string()), 1).await;
}
