use std::sync::Arc;

use anyhow::Result;

use notehub_application::{AppState, Hub, Metrics};
use notehub_infrastructure::{AppConfig, MemoryNoteUpdateStore};

pub struct AppContext {
    pub config: AppConfig,
    pub state: AppState,
}

impl AppContext {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::load().await?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: AppConfig) -> Self {
        let runtime_config = config.to_runtime_config();
        let store = Arc::new(MemoryNoteUpdateStore::new(config.store_max_updates_per_note));
        let metrics = Arc::new(Metrics::default());
        let hub = Hub::new(store.clone(), metrics.clone(), runtime_config.hub.clone());

        let state = AppState {
            config: runtime_config,
            store,
            hub,
            metrics,
        };
        Self { config, state }
    }
}
