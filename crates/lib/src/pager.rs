//! Pagination loader: extends the visible history upward on demand without
//! disrupting the reader's scroll position.
//!
//! Older pages are fetched by continuation token when the viewport nears
//! the top, merged without duplicates, and the caller restores the scroll
//! offset with `restored_scroll_top`. The initial page load on entering a
//! context is a distinct, non-incremental operation that replaces the store
//! wholesale. Loads are gated by their own in-flight flag and do not block
//! sends; the epoch guard drops results that resolve after a context
//! switch.

use crate::remote::{RemoteError, RemoteService};
use crate::session::SharedState;
use std::sync::Arc;

/// Distance from the top of the viewport, in pixels, below which the next
/// older page is requested.
pub const TOP_THRESHOLD_PX: f64 = 200.0;

/// Opaque continuation token plus whether more history exists.
#[derive(Debug, Clone, Default)]
pub struct PaginationCursor {
    pub token: Option<String>,
    pub has_more: bool,
}

/// Scroll metrics reported by the viewport before a prepend.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub scroll_top: f64,
    pub scroll_height: f64,
}

/// Scroll offset that keeps the reader's viewpoint fixed after older
/// content was prepended above it.
pub fn restored_scroll_top(old: Viewport, new_scroll_height: f64) -> f64 {
    new_scroll_height - old.scroll_height + old.scroll_top
}

pub struct HistoryPager {
    state: SharedState,
    remote: Arc<dyn RemoteService>,
    top_threshold: f64,
}

impl HistoryPager {
    pub(crate) fn new(state: SharedState, remote: Arc<dyn RemoteService>) -> Self {
        Self {
            state,
            remote,
            top_threshold: TOP_THRESHOLD_PX,
        }
    }

    pub fn with_top_threshold(mut self, threshold: f64) -> Self {
        self.top_threshold = threshold;
        self
    }

    /// True when the viewport is within the top threshold, more history
    /// exists behind a continuation token, and no older-page load is in
    /// flight.
    pub async fn should_load_older(&self, viewport: Viewport) -> bool {
        if viewport.scroll_top > self.top_threshold {
            return false;
        }
        let state = self.state.read().await;
        state.cursor.has_more && state.cursor.token.is_some() && !state.loading_older
    }

    /// Fetch and merge the next older page. Returns `Ok(true)` when a page
    /// was applied, `Ok(false)` when there was nothing to do (no token, a
    /// load already in flight, or a stale context). A failed fetch leaves
    /// cursor and store unchanged; the user retries by scrolling again.
    pub async fn load_older(&self) -> Result<bool, RemoteError> {
        let (world_id, token, epoch) = {
            let mut state = self.state.write().await;
            if state.loading_older {
                return Ok(false);
            }
            let Some(token) = state.cursor.token.clone() else {
                return Ok(false);
            };
            let Some(world_id) = state.selector.active_world().map(str::to_string) else {
                return Ok(false);
            };
            state.loading_older = true;
            (world_id, token, state.selector.epoch())
        };

        let result = self.remote.fetch_older_history(&world_id, &token).await;

        let mut state = self.state.write().await;
        if !state.selector.is_current(epoch) {
            // The switch already reset the in-flight flag for the new
            // context; leave it alone.
            log::debug!("older-page load resolved for a stale context, dropping it");
            return Ok(false);
        }
        state.loading_older = false;
        match result {
            Ok(page) => {
                state.store.merge_older(page.turns);
                state.cursor.has_more = page.continuation_token.is_some();
                state.cursor.token = page.continuation_token;
                Ok(true)
            }
            Err(err) => {
                log::warn!("older-page fetch failed: {err}");
                Err(err)
            }
        }
    }

    /// Initial page for the just-activated context: newest page only,
    /// wholesale store replacement. The caller scrolls to the bottom.
    pub async fn load_initial(&self) -> Result<(), RemoteError> {
        let (world_id, epoch) = {
            let state = self.state.read().await;
            (
                state.selector.active_world().map(str::to_string),
                state.selector.epoch(),
            )
        };

        let result = self.remote.fetch_initial_history(world_id.as_deref()).await;

        let mut state = self.state.write().await;
        if !state.selector.is_current(epoch) {
            log::debug!("initial load resolved for a stale context, dropping it");
            return Ok(());
        }
        match result {
            Ok(page) => {
                state.store.initialize(page.turns);
                state.cursor.has_more = page.continuation_token.is_some();
                state.cursor.token = page.continuation_token;
                Ok(())
            }
            Err(err) => {
                log::warn!("initial history load failed: {err}");
                Err(err)
            }
        }
    }
}
