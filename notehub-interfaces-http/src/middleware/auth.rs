use std::io::Read;

use anyhow::{anyhow, Result};
use axum::http::HeaderMap;
use flate2::read::GzDecoder;

use notehub_domain::{NoteEventRequest, RuntimeConfig};

pub fn authorize(config: &RuntimeConfig, headers: &HeaderMap) -> bool {
    authorize_with_query(config, headers, None)
}

/// Browsers cannot set headers on a WebSocket handshake, so the upgrade route
/// also accepts the token as `?access_token=`.
pub fn authorize_with_query(
    config: &RuntimeConfig,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> bool {
    let Some(api_token) = &config.api_token else {
        return true;
    };
    if let Some(token) = extract_bearer(headers) {
        return token == *api_token;
    }
    query_token
        .map(str::trim)
        .map(|token| !token.is_empty() && token == api_token)
        .unwrap_or(false)
}

pub fn parse_note_event(headers: &HeaderMap, body: &[u8]) -> Result<NoteEventRequest> {
    let content = maybe_gunzip(headers, body)?;
    if content.trim().is_empty() {
        return Err(anyhow!("empty request body"));
    }
    Ok(serde_json::from_str(&content)?)
}

fn maybe_gunzip(headers: &HeaderMap, body: &[u8]) -> Result<String> {
    if let Some(encoding) = headers.get("Content-Encoding") {
        if encoding.to_str().unwrap_or("") == "gzip" {
            let mut decoder = GzDecoder::new(body);
            let mut out = String::new();
            decoder.read_to_string(&mut out)?;
            return Ok(out);
        }
    }
    Ok(String::from_utf8(body.to_vec())?)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
