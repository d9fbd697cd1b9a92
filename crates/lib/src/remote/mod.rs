//! Boundary to the externally-owned chat/history service.
//!
//! `RemoteService` is the seam the session controller and pagination loader
//! talk through; `HttpRemote` is the production implementation, in-memory
//! fakes stand in for it in tests.

mod http;
pub mod wire;

pub use http::HttpRemote;
pub use wire::{HistoryEntry, SendTurnRequest};

use crate::context::World;
use crate::settings::UserSettings;
use crate::turn::ChatTurn;
use async_trait::async_trait;

/// Everything that can go wrong at the network boundary. All variants are
/// converted into user-visible fallbacks by the callers; none are retried
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("remote returned an empty body")]
    EmptyBody,
    #[error("remote returned a malformed body: {0}")]
    Malformed(String),
    #[error("remote rejected the request: {0}")]
    Api(String),
}

/// One normalized page of history: turns in record order plus the token for
/// the next older page, when one exists.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub turns: Vec<ChatTurn>,
    pub continuation_token: Option<String>,
}

#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Post a conversational turn. `Ok(None)` means the reply field was
    /// absent from an otherwise well-formed response.
    async fn send_turn(&self, request: SendTurnRequest) -> Result<Option<String>, RemoteError>;

    /// Newest page (world context) or flat list (default context).
    async fn fetch_initial_history(
        &self,
        world_id: Option<&str>,
    ) -> Result<HistoryPage, RemoteError>;

    /// Next older page for a world, by continuation token.
    async fn fetch_older_history(
        &self,
        world_id: &str,
        continuation_token: &str,
    ) -> Result<HistoryPage, RemoteError>;

    /// Delete the persisted record behind a turn pair.
    async fn delete_turn(&self, world_id: Option<&str>, remote_id: &str)
        -> Result<(), RemoteError>;

    async fn fetch_settings(&self) -> Result<UserSettings, RemoteError>;

    async fn save_settings(&self, settings: &UserSettings) -> Result<(), RemoteError>;

    async fn list_worlds(&self) -> Result<Vec<World>, RemoteError>;

    async fn save_world(&self, world: &World) -> Result<(), RemoteError>;

    async fn delete_world(&self, world_id: &str) -> Result<(), RemoteError>;
}
