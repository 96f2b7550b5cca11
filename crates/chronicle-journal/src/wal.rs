//! The write-ahead durability journal.
//!
//! Before an append is considered committed, its payload is mirrored to a
//! journal file colocated with the log. After the log write succeeds the
//! journal entry is cleared. On startup, any journal entry with no matching
//! committed log line is replayed and the journal truncated — this recovers
//! "crash between journal write and log flush" without losing or
//! duplicating an entry. Replay is idempotent because every committed line
//! embeds the entry id the journal staged it under.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use chronicle_contracts::{
    error::{ChronicleError, ChronicleResult},
    journal::JournalEntry,
    layout::ProjectLayout,
};
use chronicle_integrity::fsio;

use crate::append::LogLine;

/// The journal guarding one live log file.
pub struct DurabilityJournal {
    path: PathBuf,
}

impl DurabilityJournal {
    /// The journal colocated with `live_log` (`<log>.journal`).
    pub fn for_log(live_log: &Path) -> Self {
        Self {
            path: ProjectLayout::journal_path(live_log),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mirror an in-flight entry to the journal, flushed before returning.
    ///
    /// Must complete before the payload touches the canonical log — that
    /// ordering is the whole durability contract.
    pub fn stage(&self, entry: &JournalEntry) -> ChronicleResult<()> {
        let line = serde_json::to_string(entry).map_err(|e| ChronicleError::StoreFailed {
            reason: format!("serializing journal entry: {}", e),
        })?;
        fsio::append_line(&self.path, &line)
    }

    /// Drop one entry from the journal after its append committed.
    pub fn clear_entry(&self, entry_id: &Uuid) -> ChronicleResult<()> {
        let remaining: Vec<JournalEntry> = self
            .pending()?
            .into_iter()
            .filter(|e| e.entry_id != *entry_id)
            .collect();

        if remaining.is_empty() {
            match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ChronicleError::Io {
                    context: format!("removing journal {}", self.path.display()),
                    source: e,
                }),
            }
        } else {
            let mut body = String::new();
            for entry in &remaining {
                let line = serde_json::to_string(entry).map_err(|e| ChronicleError::StoreFailed {
                    reason: format!("serializing journal entry: {}", e),
                })?;
                body.push_str(&line);
                body.push('\n');
            }
            fsio::atomic_replace(&self.path, body.as_bytes())
        }
    }

    /// All entries currently staged in the journal.
    ///
    /// A torn trailing line (a crash mid-stage) is skipped with a warning —
    /// an entry whose journal write never completed was never promised to
    /// the caller.
    pub fn pending(&self) -> ChronicleResult<Vec<JournalEntry>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ChronicleError::Io {
                    context: format!("reading journal {}", self.path.display()),
                    source: e,
                })
            }
        };

        let mut entries = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<JournalEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(
                        journal = %self.path.display(),
                        error = %e,
                        "skipping torn journal line"
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Replay every staged entry that never reached `live_log`, then clear
    /// the journal. Returns the number of entries replayed.
    pub fn recover(&self, live_log: &Path) -> ChronicleResult<usize> {
        let pending = self.pending()?;
        if pending.is_empty() {
            return Ok(0);
        }

        let committed = committed_ids(live_log)?;
        let mut replayed = 0;
        for entry in pending {
            if committed.contains(&entry.entry_id) {
                continue;
            }
            let line = LogLine {
                id: entry.entry_id,
                ts: entry.queued_at,
                entry: entry.payload.clone(),
            };
            let raw = serde_json::to_string(&line).map_err(|e| ChronicleError::StoreFailed {
                reason: format!("serializing replayed line: {}", e),
            })?;
            fsio::append_line(live_log, &raw)?;
            replayed += 1;
            debug!(
                entry_id = %entry.entry_id,
                log = %live_log.display(),
                "replayed journal entry"
            );
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ChronicleError::Io {
                    context: format!("clearing journal {}", self.path.display()),
                    source: e,
                })
            }
        }
        Ok(replayed)
    }
}

/// Entry ids already committed to a log.
fn committed_ids(log: &Path) -> ChronicleResult<HashSet<Uuid>> {
    let raw = match fs::read_to_string(log) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => {
            return Err(ChronicleError::Io {
                context: format!("reading log {}", log.display()),
                source: e,
            })
        }
    };

    Ok(raw
        .lines()
        .filter_map(|line| serde_json::from_str::<LogLine>(line).ok())
        .map(|line| line.id)
        .collect())
}
