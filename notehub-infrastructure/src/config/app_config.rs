use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use notehub_domain::{HubConfig, RuntimeConfig};

use super::validation::{validate_log_format, validate_millis};

const MAX_BROADCAST_PERIOD_MS: u64 = 60 * 60 * 1000;
const MAX_CACHE_TTL_MS: u64 = 24 * 60 * 60 * 1000;
const MAX_STORE_RETRIES: u32 = 10;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub broadcast_period_ms: u64,
    pub cache_ttl_ms: u64,
    pub cache_sweep_ms: u64,
    pub broadcast_store_retries: u32,
    pub store_max_updates_per_note: usize,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
    pub log_format: String,
    pub log_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            broadcast_period_ms: 2_000,
            cache_ttl_ms: 30_000,
            cache_sweep_ms: 0,
            broadcast_store_retries: 0,
            store_max_updates_per_note: 256,
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 15,
            log_format: "text".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> String {
        env::var("NOTEHUB_CONFIG").unwrap_or_else(|_| "./config.toml".to_string())
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path();
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            Self::from_toml_str(&content)?
        } else {
            warn!(path = %path, "config file not found, using defaults");
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| anyhow!("invalid config: {}", err))
    }

    pub fn normalize(&mut self) {
        if let Some(api_token) = &self.api_token {
            if api_token.trim().is_empty() {
                self.api_token = None;
            }
        }
        if let Some(log_dir) = &self.log_dir {
            if log_dir.trim().is_empty() {
                self.log_dir = None;
            }
        }
        self.log_format = self.log_format.trim().to_lowercase();
        if self.log_format.is_empty() {
            self.log_format = "text".to_string();
        }
        if self.cache_sweep_ms == 0 {
            self.cache_sweep_ms = self.cache_ttl_ms;
        }
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        if let Some(log_dir) = &self.log_dir {
            self.log_dir = Some(resolve_path(base, log_dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        validate_millis(
            "broadcast_period_ms",
            self.broadcast_period_ms,
            MAX_BROADCAST_PERIOD_MS,
        )?;
        validate_millis("cache_ttl_ms", self.cache_ttl_ms, MAX_CACHE_TTL_MS)?;
        validate_millis("cache_sweep_ms", self.cache_sweep_ms, MAX_CACHE_TTL_MS)?;
        if self.broadcast_store_retries > MAX_STORE_RETRIES {
            return Err(anyhow!(
                "broadcast_store_retries must be at most {}",
                MAX_STORE_RETRIES
            ));
        }
        if self.store_max_updates_per_note == 0 {
            return Err(anyhow!("store_max_updates_per_note must be greater than 0"));
        }
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }
        validate_log_format(&self.log_format)?;
        Ok(())
    }

    pub fn to_hub_config(&self) -> HubConfig {
        HubConfig {
            broadcast_period: Duration::from_millis(self.broadcast_period_ms),
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
            cache_sweep_period: Duration::from_millis(self.cache_sweep_ms),
            store_retries: self.broadcast_store_retries,
        }
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
            hub: self.to_hub_config(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("NOTEHUB_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("NOTEHUB_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("NOTEHUB_BROADCAST_PERIOD_MS") {
            self.broadcast_period_ms = value.parse().unwrap_or(self.broadcast_period_ms);
        }
        if let Ok(value) = env::var("NOTEHUB_CACHE_TTL_MS") {
            self.cache_ttl_ms = value.parse().unwrap_or(self.cache_ttl_ms);
        }
        if let Ok(value) = env::var("NOTEHUB_CACHE_SWEEP_MS") {
            self.cache_sweep_ms = value.parse().unwrap_or(self.cache_sweep_ms);
        }
        if let Ok(value) = env::var("NOTEHUB_BROADCAST_STORE_RETRIES") {
            self.broadcast_store_retries = value.parse().unwrap_or(self.broadcast_store_retries);
        }
        if let Ok(value) = env::var("NOTEHUB_STORE_MAX_UPDATES_PER_NOTE") {
            self.store_max_updates_per_note =
                value.parse().unwrap_or(self.store_max_updates_per_note);
        }
        if let Ok(value) = env::var("NOTEHUB_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Ok(value) = env::var("NOTEHUB_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
        if let Ok(value) = env::var("NOTEHUB_LOG_FORMAT") {
            self.log_format = value;
        }
        if let Ok(value) = env::var("NOTEHUB_LOG_DIR") {
            self.log_dir = Some(value);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}
