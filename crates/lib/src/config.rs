//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.fable/config.json`) and
//! environment. Carries the remote service endpoint and the chat tuning
//! knobs; missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Remote chat/history service endpoint.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Chat session tuning.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Remote service base URL and optional bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Base URL of the remote service (default "http://127.0.0.1:8787").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token. Overridden by FABLE_API_TOKEN env when set.
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
        }
    }
}

/// Chat session tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Trailing turns sent as context with each message (default 10).
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Delay in milliseconds before the post-send history reload in a world
    /// context (default 1500).
    #[serde(default = "default_world_reload_delay_ms")]
    pub world_reload_delay_ms: u64,

    /// Pixel distance from the viewport top that triggers an older-page
    /// load (default 200).
    #[serde(default = "default_top_threshold_px")]
    pub top_threshold_px: f64,
}

fn default_history_window() -> usize {
    10
}

fn default_world_reload_delay_ms() -> u64 {
    1500
}

fn default_top_threshold_px() -> f64 {
    200.0
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            world_reload_delay_ms: default_world_reload_delay_ms(),
            top_threshold_px: default_top_threshold_px(),
        }
    }
}

impl ChatConfig {
    pub fn options(&self) -> crate::session::ChatOptions {
        crate::session::ChatOptions {
            history_window: self.history_window,
            world_reload_delay: Duration::from_millis(self.world_reload_delay_ms),
            top_threshold_px: self.top_threshold_px,
        }
    }
}

/// Resolve the API token: env FABLE_API_TOKEN overrides config.
pub fn resolve_api_token(config: &Config) -> Option<String> {
    std::env::var("FABLE_API_TOKEN")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .remote
                .token
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("FABLE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".fable").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or FABLE_CONFIG_PATH). Missing file
/// => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
