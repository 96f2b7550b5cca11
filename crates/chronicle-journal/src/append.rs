//! The guarded append path.
//!
//! Every append runs the same fixed sequence: rate-limit check, journal
//! stage, committed log write, journal clear. A crash at any point either
//! leaves the entry fully absent (before the stage), staged for replay
//! (between stage and log write), or committed with a stale journal entry
//! that recovery recognizes by id and skips.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use chronicle_contracts::{
    error::{ChronicleError, ChronicleResult},
    journal::JournalEntry,
    layout::{is_safe_log_type, ProjectLayout},
};
use chronicle_integrity::fsio;

use crate::ratelimit::AppendRateLimiter;
use crate::wal::DurabilityJournal;

/// One committed log line. `id` ties the line back to the journal entry
/// that staged it, which is what makes crash replay idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub entry: String,
}

/// The append front door: rate limiting plus write-ahead durability over
/// the shared project layout.
pub struct LogAppender {
    layout: ProjectLayout,
    limiter: AppendRateLimiter,
}

impl LogAppender {
    pub fn new(layout: ProjectLayout, limiter: AppendRateLimiter) -> Self {
        Self { layout, limiter }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Append one timestamped entry to a project log.
    ///
    /// Returns the committed entry's id. Fails with `RateLimited` when the
    /// project's window is exhausted, before anything is written.
    pub fn append(&self, project: &str, log_type: &str, entry: &str) -> ChronicleResult<Uuid> {
        if !is_safe_log_type(log_type) {
            return Err(ChronicleError::Validation {
                reason: format!(
                    "log type '{}' must be non-empty ASCII alphanumerics, '-' or '_'",
                    log_type
                ),
            });
        }

        self.limiter.check_and_record(project)?;

        let live = self.layout.live_log(project, log_type);
        if let Some(parent) = live.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChronicleError::Io {
                context: format!("creating project directory {}", parent.display()),
                source: e,
            })?;
        }

        let staged = JournalEntry::new(project, log_type, entry);
        let journal = DurabilityJournal::for_log(&live);
        journal.stage(&staged)?;

        let line = LogLine {
            id: staged.entry_id,
            ts: staged.queued_at,
            entry: entry.to_string(),
        };
        let raw = serde_json::to_string(&line).map_err(|e| ChronicleError::StoreFailed {
            reason: format!("serializing log line: {}", e),
        })?;
        fsio::append_line(&live, &raw)?;

        journal.clear_entry(&staged.entry_id)?;

        debug!(project, log_type, entry_id = %staged.entry_id, "entry appended");
        Ok(staged.entry_id)
    }

    /// Replay every non-empty journal under a project's directory.
    ///
    /// Called once at process start. Returns the total entries replayed.
    pub fn recover_project(&self, project: &str) -> ChronicleResult<usize> {
        let dir = self.layout.project_dir(project);
        if !dir.is_dir() {
            return Ok(0);
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| ChronicleError::Io {
            context: format!("listing {}", dir.display()),
            source: e,
        })?;

        // Scan for journals rather than logs: a crash before the very first
        // log write leaves a journal with no log file at all.
        let mut replayed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            let live = match name.as_deref().and_then(|n| n.strip_suffix(".journal")) {
                Some(log_name) => path.with_file_name(log_name),
                None => continue,
            };
            replayed += DurabilityJournal::for_log(&live).recover(&live)?;
        }
        Ok(replayed)
    }
}
