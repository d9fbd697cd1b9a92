//! In-memory message store for the active context.
//!
//! Holds the ordered turn sequence and the merge operations that keep it
//! chronological and free of duplicates. Operations are pure and local;
//! they never perform I/O and cannot fail. Ordering is ascending by
//! timestamp with insertion order breaking ties (stable sort).

use crate::turn::ChatTurn;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    turns: Vec<ChatTurn>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Replace the contents with a sorted copy of `turns`. Used on context
    /// switch and on a fresh initial load.
    pub fn initialize(&mut self, mut turns: Vec<ChatTurn>) {
        turns.sort_by_key(|t| t.timestamp);
        self.turns = turns;
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Append at the end without re-sorting; appended turns are assumed
    /// newest (the optimistic user turn and the resulting reply).
    pub fn append_local(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Merge a page of older turns: drop any whose `remote_id` is already
    /// present, concatenate, and re-sort the full set. Merging the same
    /// page twice yields the same store as merging it once.
    pub fn merge_older(&mut self, older: Vec<ChatTurn>) {
        let known: HashSet<String> = self
            .turns
            .iter()
            .filter_map(|t| t.remote_id.clone())
            .collect();
        // A user/assistant pair shares one remote_id on purpose, so the
        // filter only checks against turns already in the store.
        self.turns.extend(
            older
                .into_iter()
                .filter(|t| t.remote_id.as_ref().map_or(true, |id| !known.contains(id))),
        );
        self.turns.sort_by_key(|t| t.timestamp);
    }

    /// Remove every turn sharing `remote_id`: when the backing record is
    /// deleted, the user/assistant pair built from it goes together.
    pub fn remove_by_remote_id(&mut self, remote_id: &str) {
        self.turns
            .retain(|t| t.remote_id.as_deref() != Some(remote_id));
    }

    /// The trailing window of at most the last `n` turns, oldest-first.
    pub fn tail_window(&self, n: usize) -> &[ChatTurn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }
}
