//! Player configuration

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;
use uuid::Uuid;

use crate::infrastructure::http_client::DEFAULT_REQUEST_TIMEOUT;
use crate::state::SyncConfig;

/// Headless client configuration loaded from environment
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Engine base URL
    pub engine_url: Url,
    /// Interval between background refreshes
    pub poll_interval: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Room to join; a new one is created when unset
    pub room_id: Option<Uuid>,
    /// Name to register as
    pub player_name: String,
    /// Name of the room created when `room_id` is unset
    pub room_name: String,
    /// Local storage file; the platform config directory when unset
    pub storage_path: Option<PathBuf>,
}

impl PlayerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let engine_url = var("ENGINE_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let engine_url = Url::parse(engine_url.trim())
            .with_context(|| format!("ENGINE_URL is not a valid URL: {engine_url}"))?;

        let poll_interval = match var("POLL_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("POLL_INTERVAL_MS has an invalid value: {raw}"))?,
            ),
            None => SyncConfig::default().poll_interval,
        };
        if poll_interval.is_zero() {
            anyhow::bail!("POLL_INTERVAL_MS must be greater than zero");
        }

        let request_timeout = match var("REQUEST_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("REQUEST_TIMEOUT_MS has an invalid value: {raw}"))?,
            ),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let room_id = var("ROOM_ID")
            .map(|raw| {
                Uuid::parse_str(raw.trim())
                    .with_context(|| format!("ROOM_ID is not a UUID: {raw}"))
            })
            .transpose()?;

        Ok(Self {
            engine_url,
            poll_interval,
            request_timeout,
            room_id,
            player_name: var("PLAYER_NAME")
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| "Player".to_string()),
            room_name: var("ROOM_NAME")
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| "Energy of Money".to_string()),
            storage_path: var("STORAGE_PATH").map(PathBuf::from),
        })
    }

    pub fn sync(&self) -> SyncConfig {
        SyncConfig {
            poll_interval: self.poll_interval,
            ..SyncConfig::default()
        }
    }
}
