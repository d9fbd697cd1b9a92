//! In-memory `RemoteService` fake used by unit tests across modules.

use crate::context::World;
use crate::remote::wire::{self, RemoteTurnRecord};
use crate::remote::{HistoryPage, RemoteError, RemoteService, SendTurnRequest};
use crate::settings::UserSettings;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
struct FakeRemoteState {
    reply: Option<String>,
    fail_sends: bool,
    send_gate: Option<Arc<Notify>>,
    last_request: Option<SendTurnRequest>,

    history: Vec<RemoteTurnRecord>,
    continuation_token: Option<String>,
    fail_history: bool,
    history_gate: Option<Arc<Notify>>,

    settings: Option<UserSettings>,
    fail_settings: bool,

    worlds: Vec<World>,
}

/// Scriptable fake: canned replies, failure injection, and gates that hold
/// a call open until the test releases it.
#[derive(Default)]
pub(crate) struct FakeRemote {
    state: Mutex<FakeRemoteState>,
    send_calls: AtomicUsize,
    history_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn set_reply(&self, reply: &str) {
        self.state.lock().unwrap().reply = Some(reply.to_string());
    }

    pub fn fail_sends(&self) {
        self.state.lock().unwrap().fail_sends = true;
    }

    /// Hold every send open until the returned handle is notified.
    pub fn gate_sends(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().send_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SendTurnRequest> {
        self.state.lock().unwrap().last_request.clone()
    }

    pub fn last_history(&self) -> Vec<wire::HistoryEntry> {
        self.state
            .lock()
            .unwrap()
            .last_request
            .as_ref()
            .map(|r| r.history.clone())
            .unwrap_or_default()
    }

    pub fn set_history(&self, records: Vec<RemoteTurnRecord>) {
        self.state.lock().unwrap().history = records;
    }

    pub fn set_continuation_token(&self, token: &str) {
        self.state.lock().unwrap().continuation_token = Some(token.to_string());
    }

    pub fn clear_continuation_token(&self) {
        self.state.lock().unwrap().continuation_token = None;
    }

    pub fn fail_history(&self) {
        self.state.lock().unwrap().fail_history = true;
    }

    /// Hold every history fetch open until the returned handle is notified.
    pub fn gate_history(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().history_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn set_settings(&self, settings: UserSettings) {
        self.state.lock().unwrap().settings = Some(settings);
    }

    pub fn fail_settings(&self) {
        self.state.lock().unwrap().fail_settings = true;
    }

    fn history_page(&self) -> Result<HistoryPage, RemoteError> {
        let state = self.state.lock().unwrap();
        if state.fail_history {
            return Err(RemoteError::Api("simulated history failure".to_string()));
        }
        Ok(HistoryPage {
            turns: wire::normalize_page(state.history.clone()),
            continuation_token: state.continuation_token.clone(),
        })
    }

    fn history_gate_handle(&self) -> Option<Arc<Notify>> {
        self.state.lock().unwrap().history_gate.clone()
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn send_turn(&self, request: SendTurnRequest) -> Result<Option<String>, RemoteError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.last_request = Some(request);
            state.send_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(RemoteError::Api("simulated send failure".to_string()));
        }
        Ok(state.reply.clone())
    }

    async fn fetch_initial_history(
        &self,
        _world_id: Option<&str>,
    ) -> Result<HistoryPage, RemoteError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.history_gate_handle() {
            gate.notified().await;
        }
        self.history_page()
    }

    async fn fetch_older_history(
        &self,
        _world_id: &str,
        _continuation_token: &str,
    ) -> Result<HistoryPage, RemoteError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.history_gate_handle() {
            gate.notified().await;
        }
        self.history_page()
    }

    async fn delete_turn(
        &self,
        _world_id: Option<&str>,
        _remote_id: &str,
    ) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn fetch_settings(&self) -> Result<UserSettings, RemoteError> {
        let state = self.state.lock().unwrap();
        if state.fail_settings {
            return Err(RemoteError::Api("simulated settings failure".to_string()));
        }
        Ok(state.settings.clone().unwrap_or_default())
    }

    async fn save_settings(&self, _settings: &UserSettings) -> Result<(), RemoteError> {
        let state = self.state.lock().unwrap();
        if state.fail_settings {
            return Err(RemoteError::Api("simulated settings failure".to_string()));
        }
        Ok(())
    }

    async fn list_worlds(&self) -> Result<Vec<World>, RemoteError> {
        Ok(self.state.lock().unwrap().worlds.clone())
    }

    async fn save_world(&self, world: &World) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.worlds.retain(|w| w.id != world.id);
        state.worlds.push(world.clone());
        Ok(())
    }

    async fn delete_world(&self, world_id: &str) -> Result<(), RemoteError> {
        self.state.lock().unwrap().worlds.retain(|w| w.id != world_id);
        Ok(())
    }
}
