use std::sync::Arc;

use notehub_domain::{NoteUpdateStore, RuntimeConfig};

use crate::{Hub, Metrics};

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub store: Arc<dyn NoteUpdateStore>,
    pub hub: Hub,
    pub metrics: Arc<Metrics>,
}
