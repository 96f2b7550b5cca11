//! Write-ahead journal entries for the append path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A provisional copy of one append payload.
///
/// Written to the journal file before the payload is appended to the
/// canonical log, and removed once the append is confirmed committed. On
/// restart, entries with no matching committed log line are replayed —
/// `entry_id` is embedded in the committed line, which is what makes replay
/// idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    pub project: String,
    pub log_type: String,
    /// The raw entry text the caller asked to append.
    pub payload: String,
    pub queued_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(
        project: impl Into<String>,
        log_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            project: project.into(),
            log_type: log_type.into(),
            payload: payload.into(),
            queued_at: Utc::now(),
        }
    }
}
