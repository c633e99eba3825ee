// Runtime configuration entities
// Produced by the infrastructure config loader, consumed by application and interfaces

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
    pub hub: HubConfig,
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Tick interval of the broadcast loop; the checkpoint advances by exactly this much per sweep.
    pub broadcast_period: Duration,
    /// Coalescing window of the update cache.
    pub cache_ttl: Duration,
    pub cache_sweep_period: Duration,
    /// Extra store queries per note per sweep before the note is skipped. Zero keeps delivery lossy.
    pub store_retries: u32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            broadcast_period: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(30),
            cache_sweep_period: Duration::from_secs(30),
            store_retries: 0,
        }
    }
}
