//! Per-user settings with explicit optimistic commit tracking.
//!
//! Edits apply locally first and are pushed to the remote; the local copy
//! stays authoritative (pending flag set) until an explicit remote read
//! either confirms or contradicts it. A failed fetch falls back to the
//! current local copy silently.

use crate::remote::{RemoteError, RemoteService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub response_style: Option<String>,
    #[serde(default)]
    pub conversation_style: Option<String>,
}

fn default_model() -> String {
    "default".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    1024
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            response_style: None,
            conversation_style: None,
        }
    }
}

/// Local settings copy plus the commit status of the last edit.
pub struct SettingsState {
    remote: Arc<dyn RemoteService>,
    current: UserSettings,
    pending: bool,
}

impl SettingsState {
    pub fn new(remote: Arc<dyn RemoteService>) -> Self {
        Self {
            remote,
            current: UserSettings::default(),
            pending: false,
        }
    }

    pub fn current(&self) -> &UserSettings {
        &self.current
    }

    /// True when a local edit has not yet been confirmed by a remote read.
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Refresh from the remote. A fetch failure keeps the local copy
    /// (defaults on first load) without surfacing an error. An explicit
    /// remote read that contradicts a pending local edit wins, with a
    /// warning, since the remote is the durable store.
    pub async fn load(&mut self) -> &UserSettings {
        match self.remote.fetch_settings().await {
            Ok(settings) => {
                if self.pending && settings != self.current {
                    log::warn!("remote settings contradict a locally confirmed edit; taking the remote copy");
                }
                self.current = settings;
                self.pending = false;
            }
            Err(err) => {
                log::debug!("settings fetch failed, keeping the local copy: {err}");
            }
        }
        &self.current
    }

    /// Apply locally, then push. The local copy is kept even when the push
    /// fails, and stays marked pending until a remote read confirms it.
    pub async fn save(&mut self, settings: UserSettings) -> Result<(), RemoteError> {
        self.current = settings;
        self.pending = true;
        match self.remote.save_settings(&self.current).await {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!("settings save failed, keeping the local edit: {err}");
                Err(err)
            }
        }
    }
}
