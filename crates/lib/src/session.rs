//! Chat session controller: drives the send state machine and context
//! switching over the shared per-context state.
//!
//! Per send: optimistic user turn appended first, then the remote round
//! trip, then the assistant turn (or the fixed apology turn on any
//! failure). At most one send is in flight per context; blank input is a
//! no-op. World contexts additionally schedule a short-delayed full history
//! reload after a successful send, since the remote is the source of truth
//! for a world's durable record.

use crate::context::{ContextSelector, World};
use crate::pager::PaginationCursor;
use crate::remote::{HistoryEntry, RemoteService, SendTurnRequest};
use crate::store::MessageStore;
use crate::turn::ChatTurn;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Appended in place of a reply when the round trip fails in any way.
pub const APOLOGY_REPLY: &str =
    "Sorry, something went wrong while generating a reply. Please try again.";

/// Appended when a well-formed response carries no reply field.
pub const NO_REPLY_FALLBACK: &str = "(no reply received)";

/// Tuning knobs for the controller and pager, surfaced through config.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Maximum number of trailing turns sent as context with a new message.
    pub history_window: usize,
    /// Delay before the post-send history reload in a world context.
    pub world_reload_delay: Duration,
    /// Pixel distance from the viewport top that triggers an older-page load.
    pub top_threshold_px: f64,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            history_window: 10,
            world_reload_delay: Duration::from_millis(1500),
            top_threshold_px: crate::pager::TOP_THRESHOLD_PX,
        }
    }
}

/// Shared per-context state, owned by the active context's view. Only the
/// session controller and the pagination loader mutate it, each behind its
/// own in-flight flag.
#[derive(Debug, Default)]
pub(crate) struct ChatState {
    pub(crate) store: MessageStore,
    pub(crate) selector: ContextSelector,
    pub(crate) sending: bool,
    pub(crate) cursor: PaginationCursor,
    pub(crate) loading_older: bool,
}

pub(crate) type SharedState = Arc<RwLock<ChatState>>;

/// Outcome of a `send` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input or a send already in flight; nothing happened.
    Ignored,
    /// The assistant turn was appended.
    Replied,
    /// The apology turn was appended.
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot switch context while a send is in flight")]
    SendInFlight,
}

pub struct ChatSession {
    state: SharedState,
    remote: Arc<dyn RemoteService>,
    options: ChatOptions,
}

impl ChatSession {
    pub fn new(remote: Arc<dyn RemoteService>, options: ChatOptions) -> Self {
        Self {
            state: Arc::new(RwLock::new(ChatState::default())),
            remote,
            options,
        }
    }

    /// Pagination loader sharing this session's state and remote client.
    pub fn pager(&self) -> crate::pager::HistoryPager {
        crate::pager::HistoryPager::new(Arc::clone(&self.state), Arc::clone(&self.remote))
            .with_top_threshold(self.options.top_threshold_px)
    }

    /// Snapshot of the displayed turns, oldest-first.
    pub async fn turns(&self) -> Vec<ChatTurn> {
        self.state.read().await.store.turns().to_vec()
    }

    pub async fn active_world(&self) -> Option<String> {
        self.state
            .read()
            .await
            .selector
            .active_world()
            .map(str::to_string)
    }

    pub async fn is_sending(&self) -> bool {
        self.state.read().await.sending
    }

    /// Activate a world (or the default context when `None`). Rejected while
    /// a send is in flight. Clears the store and resets the pagination
    /// cursor; the caller runs the initial load via the pager.
    pub async fn switch_context(&self, world: Option<&World>) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        if state.sending {
            return Err(SessionError::SendInFlight);
        }
        state.store.clear();
        state.cursor = PaginationCursor::default();
        state.loading_older = false;
        state.selector.set_active(world);
        Ok(())
    }

    /// Send a user turn. The optimistic user turn is visible before the
    /// remote resolves; the reply (or apology) turn follows. Returns
    /// `Ignored` without any network call for blank input or when a send is
    /// already in flight.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        let (epoch, request) = {
            let mut state = self.state.write().await;
            if state.sending {
                return SendOutcome::Ignored;
            }
            state.sending = true;
            // The window is the context for the new message, so it is taken
            // before the optimistic turn is appended.
            let history = state
                .store
                .tail_window(self.options.history_window)
                .iter()
                .map(|t| HistoryEntry {
                    role: t.role,
                    content: t.content.clone(),
                })
                .collect();
            state.store.append_local(ChatTurn::user(text));
            let request = SendTurnRequest {
                message: text.to_string(),
                history,
                settings: state.selector.current_settings().cloned(),
                world_id: state.selector.active_world().map(str::to_string),
            };
            (state.selector.epoch(), request)
        };

        let result = self.remote.send_turn(request).await;

        let mut state = self.state.write().await;
        state.sending = false;
        if !state.selector.is_current(epoch) {
            log::debug!("send resolved for a stale context, dropping the result");
            return SendOutcome::Ignored;
        }
        match result {
            Ok(reply) => {
                let content = reply
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| NO_REPLY_FALLBACK.to_string());
                state.store.append_local(ChatTurn::assistant(content));
                let world = state.selector.active_world().map(str::to_string);
                drop(state);
                if let Some(world_id) = world {
                    self.schedule_world_reload(world_id, epoch);
                }
                SendOutcome::Replied
            }
            Err(err) => {
                log::warn!("send failed: {err}");
                state.store.append_local(ChatTurn::assistant(APOLOGY_REPLY));
                SendOutcome::Failed
            }
        }
    }

    /// Delete a persisted turn pair: remote first, then the local pair.
    pub async fn delete_turn(&self, remote_id: &str) -> Result<(), crate::remote::RemoteError> {
        let world = self.active_world().await;
        self.remote.delete_turn(world.as_deref(), remote_id).await?;
        self.state
            .write()
            .await
            .store
            .remove_by_remote_id(remote_id);
        Ok(())
    }

    /// Reconcile the optimistic exchange with the remote's durable record:
    /// after a short delay, fetch the newest page and replace the store
    /// wholesale. Skipped when the context changed in the meantime.
    fn schedule_world_reload(&self, world_id: String, epoch: crate::context::Epoch) {
        let state = Arc::clone(&self.state);
        let remote = Arc::clone(&self.remote);
        let delay = self.options.world_reload_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = remote.fetch_initial_history(Some(&world_id)).await;
            let mut state = state.write().await;
            if !state.selector.is_current(epoch) {
                log::debug!("world reload resolved for a stale context, dropping it");
                return;
            }
            match result {
                Ok(page) => {
                    state.cursor.has_more = page.continuation_token.is_some();
                    state.cursor.token = page.continuation_token;
                    state.store.initialize(page.turns);
                }
                Err(err) => {
                    log::warn!("post-send history reload failed: {err}");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WorldSettings;
    use crate::testutil::FakeRemote;
    use crate::turn::Role;

    fn world(id: &str) -> World {
        World {
            id: id.to_string(),
            name: id.to_string(),
            settings: WorldSettings {
                model: Some("model-x".to_string()),
                ..WorldSettings::default()
            },
        }
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let remote = Arc::new(FakeRemote::default());
        let session = ChatSession::new(remote.clone(), ChatOptions::default());
        assert_eq!(session.send("").await, SendOutcome::Ignored);
        assert_eq!(session.send("   ").await, SendOutcome::Ignored);
        assert!(session.turns().await.is_empty());
        assert_eq!(remote.send_calls(), 0);
    }

    #[tokio::test]
    async fn success_appends_user_then_assistant() {
        let remote = Arc::new(FakeRemote::default());
        remote.set_reply("hello there");
        let session = ChatSession::new(remote.clone(), ChatOptions::default());
        assert_eq!(session.send("hi").await, SendOutcome::Replied);
        let turns = session.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hi");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "hello there");
    }

    #[tokio::test]
    async fn missing_reply_uses_fixed_fallback() {
        let remote = Arc::new(FakeRemote::default());
        // No reply configured: the fake returns Ok(None).
        let session = ChatSession::new(remote, ChatOptions::default());
        session.send("hi").await;
        let turns = session.turns().await;
        assert_eq!(turns[1].content, NO_REPLY_FALLBACK);
    }

    #[tokio::test]
    async fn failure_appends_the_apology_turn() {
        let remote = Arc::new(FakeRemote::default());
        remote.fail_sends();
        let session = ChatSession::new(remote.clone(), ChatOptions::default());
        assert_eq!(session.send("hello").await, SendOutcome::Failed);
        let turns = session.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, APOLOGY_REPLY);
    }

    #[tokio::test]
    async fn only_one_send_in_flight() {
        let remote = Arc::new(FakeRemote::default());
        remote.set_reply("slow");
        let gate = remote.gate_sends();
        let session = Arc::new(ChatSession::new(remote.clone(), ChatOptions::default()));

        let first = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.send("first").await })
        };
        // Wait until the first send holds the in-flight flag.
        while !session.is_sending().await {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.send("second").await, SendOutcome::Ignored);
        gate.notify_one();
        assert_eq!(first.await.unwrap(), SendOutcome::Replied);
        assert_eq!(remote.send_calls(), 1);
    }

    #[tokio::test]
    async fn history_window_is_capped_and_oldest_first() {
        let remote = Arc::new(FakeRemote::default());
        remote.set_reply("ok");
        let session = ChatSession::new(remote.clone(), ChatOptions::default());
        for i in 0..12 {
            session.send(&format!("m{i}")).await;
        }
        // Before the 12th send the store held 22 turns; the window is the
        // last 10 of those, oldest-first, excluding the message being sent.
        let window = remote.last_history();
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content, "m6");
        assert_eq!(window[0].role, Role::User);
        assert_eq!(window[9].content, "ok");
        assert_eq!(window[9].role, Role::Assistant);
    }

    #[tokio::test]
    async fn world_settings_accompany_the_request_frozen() {
        let remote = Arc::new(FakeRemote::default());
        remote.set_reply("ok");
        let session = ChatSession::new(remote.clone(), ChatOptions::default());
        session.switch_context(Some(&world("w1"))).await.unwrap();
        session.send("hi").await;
        let request = remote.last_request().unwrap();
        assert_eq!(request.world_id.as_deref(), Some("w1"));
        assert_eq!(
            request.settings.and_then(|s| s.model),
            Some("model-x".to_string())
        );
    }

    #[tokio::test]
    async fn default_context_sends_no_settings() {
        let remote = Arc::new(FakeRemote::default());
        remote.set_reply("ok");
        let session = ChatSession::new(remote.clone(), ChatOptions::default());
        session.send("hi").await;
        let request = remote.last_request().unwrap();
        assert!(request.settings.is_none());
        assert!(request.world_id.is_none());
    }

    #[tokio::test]
    async fn switch_is_rejected_while_sending() {
        let remote = Arc::new(FakeRemote::default());
        remote.set_reply("slow");
        let gate = remote.gate_sends();
        let session = Arc::new(ChatSession::new(remote, ChatOptions::default()));
        let task = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.send("hi").await })
        };
        while !session.is_sending().await {
            tokio::task::yield_now().await;
        }
        assert!(matches!(
            session.switch_context(Some(&world("w1"))).await,
            Err(SessionError::SendInFlight)
        ));
        gate.notify_one();
        task.await.unwrap();
        assert!(session.switch_context(Some(&world("w1"))).await.is_ok());
    }

    #[tokio::test]
    async fn world_send_schedules_a_reload() {
        let remote = Arc::new(FakeRemote::default());
        remote.set_reply("ok");
        remote.set_history(vec![crate::remote::wire::RemoteTurnRecord {
            id: "r1".to_string(),
            input: Some("persisted question".to_string()),
            ai_reply: Some("persisted answer".to_string()),
            created_utc: Some(chrono::Utc::now()),
        }]);
        let options = ChatOptions {
            world_reload_delay: Duration::from_millis(10),
            ..ChatOptions::default()
        };
        let session = ChatSession::new(remote, options);
        session.switch_context(Some(&world("w1"))).await.unwrap();
        session.send("hi").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let turns = session.turns().await;
        // Optimistic pair replaced by the remote's durable record.
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "persisted question");
        assert_eq!(turns[0].remote_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn delete_turn_removes_the_local_pair() {
        let remote = Arc::new(FakeRemote::default());
        let session = ChatSession::new(remote, ChatOptions::default());
        {
            let mut state = session.state.write().await;
            state.store.initialize(vec![
                ChatTurn::user("q").with_remote_id("r1"),
                ChatTurn::assistant("a").with_remote_id("r1"),
                ChatTurn::user("other").with_remote_id("r2"),
            ]);
        }
        session.delete_turn("r1").await.unwrap();
        let turns = session.turns().await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].remote_id.as_deref(), Some("r2"));
    }
}
