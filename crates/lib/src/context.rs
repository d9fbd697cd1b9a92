//! Active conversation context: world selection, frozen settings snapshots,
//! and the epoch counter used as the stale-response guard.
//!
//! Exactly one context is active at a time: the default context (no world,
//! no settings override) or a named world. Switching bumps the epoch; every
//! async completion captured an epoch at request time and must re-check it
//! before touching shared state.

use serde::{Deserialize, Serialize};

/// AI parameters and persona fields of a world, all independently editable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
}

/// A named world as served by the remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub settings: WorldSettings,
}

/// Identifies one activation of a context. Monotonically increasing.
pub type Epoch = u64;

#[derive(Debug, Default)]
pub struct ContextSelector {
    active: Option<String>,
    snapshot: Option<WorldSettings>,
    epoch: Epoch,
}

impl ContextSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a world, or the default context when `None`. The world's
    /// settings are frozen at selection time: later edits to the world do
    /// not retroactively change an in-flight request. Returns the new epoch.
    pub fn set_active(&mut self, world: Option<&World>) -> Epoch {
        self.active = world.map(|w| w.id.clone());
        self.snapshot = world.map(|w| w.settings.clone());
        self.epoch += 1;
        self.epoch
    }

    /// Id of the active world; `None` for the default context.
    pub fn active_world(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Settings snapshot for the next outgoing turn; `None` when the
    /// default context is active.
    pub fn current_settings(&self) -> Option<&WorldSettings> {
        self.snapshot.as_ref()
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// True when `epoch` still identifies the active context.
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.epoch == epoch
    }
}
