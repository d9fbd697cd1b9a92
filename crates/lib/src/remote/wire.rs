//! Wire types for the remote chat/history service.
//!
//! The service has shipped several payload shapes over time; key naming and
//! casing differ between integration points (`input` vs `text`, `aiReply`
//! vs `ai`, `createdUtc` vs `CreatedUtc`). All observed variants are
//! tolerated here via serde aliases so the rest of the crate stays strongly
//! typed; `normalize_record` is the single adapter from wire records to
//! `ChatTurn`s.

use crate::context::WorldSettings;
use crate::turn::ChatTurn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author role as sent in the history window.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub role: crate::turn::Role,
    pub content: String,
}

/// Body for POST /api/chat: the new text, a trailing window of at most the
/// last N turns (oldest-first), and the active world's settings if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTurnRequest {
    pub message: String,
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<WorldSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_id: Option<String>,
}

/// Reply envelope for a chat send. `ok: false` carries an error message.
#[derive(Debug, Deserialize)]
pub struct SendTurnResponse {
    #[serde(default = "default_true")]
    pub ok: bool,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

/// One persisted exchange from the history endpoints. A single record holds
/// both the user input and the assistant reply.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteTurnRecord {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(default, alias = "text")]
    pub input: Option<String>,
    #[serde(default, rename = "aiReply", alias = "ai")]
    pub ai_reply: Option<String>,
    #[serde(default, rename = "createdUtc", alias = "CreatedUtc")]
    pub created_utc: Option<DateTime<Utc>>,
}

/// Envelope for the history endpoints: a page of records plus the opaque
/// continuation token for the next older page, when one exists.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    #[serde(default, alias = "Items")]
    pub items: Vec<RemoteTurnRecord>,
    #[serde(default, alias = "ContinuationToken")]
    pub continuation_token: Option<String>,
}

/// Generic ack envelope (deletes, saves).
#[derive(Debug, Deserialize)]
pub struct AckResponse {
    #[serde(default = "default_true")]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Split one remote record into the turn pair it represents. Both turns
/// share the record id as `remote_id` and the record's timestamp; the user
/// turn is emitted first so a stable sort keeps it ahead of the reply.
pub fn normalize_record(record: RemoteTurnRecord) -> Vec<ChatTurn> {
    let timestamp = record.created_utc.unwrap_or_else(Utc::now);
    let mut turns = Vec::with_capacity(2);
    if let Some(input) = record.input.filter(|s| !s.is_empty()) {
        turns.push(
            ChatTurn::user(input)
                .with_remote_id(record.id.clone())
                .at(timestamp),
        );
    }
    if let Some(reply) = record.ai_reply.filter(|s| !s.is_empty()) {
        turns.push(
            ChatTurn::assistant(reply)
                .with_remote_id(record.id)
                .at(timestamp),
        );
    }
    turns
}

/// Normalize a whole page, preserving record order within the page.
pub fn normalize_page(items: Vec<RemoteTurnRecord>) -> Vec<ChatTurn> {
    items.into_iter().flat_map(normalize_record).collect()
}
