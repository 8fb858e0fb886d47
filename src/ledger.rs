//! In-memory conversation ledger
//!
//! Accumulated storytelling turns per (room, chapter). Records live for the
//! life of the process; there is no eviction, the backend is the system of
//! record and this map only feeds prompt assembly.

use std::collections::HashMap;
use tokio::sync::Mutex;

/// Ledger key: (room id, chapter id). No two records share a key.
pub type LedgerKey = (String, i64);

/// Accumulated conversation state for one room/chapter.
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    /// Transcript from the first request that created the record
    pub transcript: String,
    pub account_id: i64,
    pub timestamp: String,
    /// Narrative-formatted turns, in arrival order
    pub turns: Vec<String>,
}

/// Process-wide conversation store.
///
/// The whole map sits behind one async mutex so append-then-read is atomic
/// per key: concurrent requests for the same chapter cannot interleave their
/// appends.
#[derive(Debug, Default)]
pub struct ConversationLedger {
    records: Mutex<HashMap<LedgerKey, ConversationRecord>>,
}

impl ConversationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transcript turn for a key and return the accumulated turns.
    ///
    /// Creates the record on first use. The `transcript`, `account_id`, and
    /// `timestamp` of the first request stick; later calls only append.
    pub async fn append_and_snapshot(
        &self,
        key: LedgerKey,
        transcript: &str,
        account_id: i64,
        timestamp: &str,
    ) -> Vec<String> {
        let mut records = self.records.lock().await;
        let record = records.entry(key).or_insert_with(|| ConversationRecord {
            transcript: transcript.to_string(),
            account_id,
            timestamp: timestamp.to_string(),
            turns: Vec::new(),
        });
        record.turns.push(format!("User said: {}", transcript));
        record.turns.clone()
    }

    /// Number of distinct (room, chapter) records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}
