//! Transcript parsing and narrative formatting
//!
//! The frontend records each storytelling session as a JSON array of turns
//! and ships it inside the `transcript` field of the request body. Before the
//! text goes to Bubble it is flattened into `role: text` lines.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A single conversation turn as recorded by the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub message: String,
    #[serde(rename = "isSelf")]
    pub is_self: bool,
}

/// Transcript submission from the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRequest {
    pub user_room_id: String,
    pub chapter_id: i64,
    /// JSON-encoded array of [`Turn`]s
    pub transcript: String,
    pub account_id: i64,
    pub timestamp: String,
}

/// Parse the JSON-encoded turn array carried in a transcript request.
pub fn parse_turns(raw: &str) -> Result<Vec<Turn>> {
    serde_json::from_str(raw).context("Failed to parse transcript turns")
}

/// Flatten turns into the `role: text` lines Bubble expects.
///
/// User turns become `user: <msg>\n` and bot turns `bot:<msg>\n` — no space
/// after `bot:`, the backend parser relies on that exact shape. Messages are
/// trimmed of surrounding whitespace.
pub fn format_turns(turns: &[Turn]) -> String {
    let mut formatted = String::new();
    for turn in turns {
        let message = turn.message.trim();
        if turn.is_self {
            formatted.push_str(&format!("user: {}\n", message));
        } else {
            formatted.push_str(&format!("bot:{}\n", message));
        }
    }
    formatted
}
