// Fakes for the hub ports

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use notehub_domain::{
    Connection, ConnectionId, HubConfig, NoteId, NoteUpdateStore, Notification, NotificationKind,
    RuntimeConfig, TransportError,
};

use crate::{AppState, Hub, Metrics};

pub struct RecordingConnection {
    id: ConnectionId,
    open_tx: watch::Sender<bool>,
    fail_sends: AtomicBool,
    sent: Mutex<Vec<Notification>>,
    attempts: Mutex<usize>,
    reads: Mutex<usize>,
}

impl RecordingConnection {
    pub fn new() -> Arc<Self> {
        let (open_tx, _open_rx) = watch::channel(true);
        Arc::new(Self {
            id: ConnectionId::new(),
            open_tx,
            fail_sends: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            attempts: Mutex::new(0),
            reads: Mutex::new(0),
        })
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().expect("attempts lock")
    }

    /// How many times a watcher started reading.
    pub fn reads(&self) -> usize {
        *self.reads.lock().expect("reads lock")
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Simulates the peer going away; wakes any pending `recv`.
    pub fn drop_peer(&self) {
        self.open_tx.send_replace(false);
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_open(&self) -> bool {
        *self.open_tx.borrow()
    }

    async fn send(&self, notification: &Notification) -> Result<(), TransportError> {
        *self.attempts.lock().expect("attempts lock") += 1;
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Io("broken pipe".to_string()));
        }
        self.sent.lock().expect("sent lock").push(notification.clone());
        Ok(())
    }

    async fn recv(&self) -> Result<(), TransportError> {
        *self.reads.lock().expect("reads lock") += 1;
        let mut open_rx = self.open_tx.subscribe();
        let _ = open_rx.wait_for(|open| !*open).await;
        Err(TransportError::Closed)
    }

    async fn close(&self) {
        self.open_tx.send_replace(false);
    }
}

/// Store whose answers are scripted per call; an empty script answers with no updates.
#[derive(Default)]
pub struct ScriptedStore {
    script: Mutex<VecDeque<Result<Vec<Notification>, String>>>,
    queries: Mutex<Vec<(NoteId, DateTime<Utc>)>>,
    appended: Mutex<Vec<Notification>>,
    reject_appends: AtomicBool,
    query_delay: Mutex<Option<Duration>>,
}

impl ScriptedStore {
    pub fn push_ok(&self, updates: Vec<Notification>) {
        self.script.lock().expect("script lock").push_back(Ok(updates));
    }

    pub fn push_err(&self, message: &str) {
        self.script
            .lock()
            .expect("script lock")
            .push_back(Err(message.to_string()));
    }

    pub fn queries(&self) -> Vec<(NoteId, DateTime<Utc>)> {
        self.queries.lock().expect("queries lock").clone()
    }

    pub fn appended(&self) -> Vec<Notification> {
        self.appended.lock().expect("appended lock").clone()
    }

    /// Every later `updates_since` sleeps this long before answering.
    pub fn delay_queries(&self, delay: Duration) {
        *self.query_delay.lock().expect("delay lock") = Some(delay);
    }

    pub fn reject_appends(&self) {
        self.reject_appends.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NoteUpdateStore for ScriptedStore {
    async fn updates_since(
        &self,
        note_id: &NoteId,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Notification>> {
        self.queries
            .lock()
            .expect("queries lock")
            .push((note_id.clone(), since));
        let delay = *self.query_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.lock().expect("script lock").pop_front() {
            Some(Ok(updates)) => Ok(updates),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn append_update(&self, notification: &Notification) -> anyhow::Result<()> {
        if self.reject_appends.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("store is read-only"));
        }
        self.appended
            .lock()
            .expect("appended lock")
            .push(notification.clone());
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn note(raw: &str) -> NoteId {
    NoteId(raw.to_string())
}

pub fn updated_by(note_id: &NoteId, actor: &str) -> Notification {
    Notification::new(NotificationKind::Updated, note_id.clone(), actor)
}

/// Polls `condition` on the runtime until it holds or a second passes.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub fn app_state(store: Arc<ScriptedStore>) -> AppState {
    let metrics = Arc::new(Metrics::default());
    let hub_config = HubConfig {
        broadcast_period: Duration::from_millis(100),
        cache_ttl: Duration::from_secs(5),
        cache_sweep_period: Duration::from_secs(5),
        store_retries: 0,
    };
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
