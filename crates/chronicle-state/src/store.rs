//! File-backed implementation of `StateStore`.
//!
//! One document, one lock. All projects share a single physical state file,
//! so the mutex is document-global — it serializes persistence, not
//! computation: the orchestrator computes digests and counts outside, and
//! only enters here for the read-modify-write. Every mutation persists via
//! temp-file-then-atomic-rename before the lock is released (the rename
//! itself retries briefly inside `fsio` for platforms that refuse to replace
//! an open file).
//!
//! The document loads lazily on first access and is never explicitly torn
//! down — crash-only design, correctness cannot depend on clean shutdown.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use tracing::warn;

use chronicle_contracts::{
    error::{ChronicleError, ChronicleResult},
    rotation::RotationRecord,
    state::{CachedStats, GlobalSettings, ProjectState, StateDocument},
};
use chronicle_core::traits::StateStore;
use chronicle_integrity::fsio;

/// The global pointer-state store.
pub struct FileStateStore {
    path: PathBuf,
    /// Lazily loaded document. `None` until first access.
    inner: Mutex<Option<StateDocument>>,
}

impl FileStateStore {
    /// Create a store over the document at `path`. Nothing is read until
    /// the first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(None),
        }
    }

    /// Load the document from disk, or start fresh.
    ///
    /// Mirrors the audit store's policy: an unreadable or corrupted document
    /// is logged and replaced. The archives themselves plus the audit trail
    /// remain the recoverable source of truth.
    fn load(&self) -> StateDocument {
        match std::fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<StateDocument>(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "state document corrupted, starting fresh"
                    );
                    StateDocument::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateDocument::new(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "state document unreadable, starting fresh"
                );
                StateDocument::new()
            }
        }
    }

    /// Run `op` against the loaded document under the global lock.
    ///
    /// When `persist` is set, the document's `last_updated` is stamped and
    /// the whole document is atomically rewritten before the lock drops.
    fn with_doc<R>(
        &self,
        persist: bool,
        op: impl FnOnce(&mut StateDocument) -> R,
    ) -> ChronicleResult<R> {
        let mut slot = self.inner.lock().map_err(|_| ChronicleError::StoreFailed {
            reason: "state document lock poisoned".to_string(),
        })?;
        let doc = slot.get_or_insert_with(|| self.load());

        let out = op(doc);

        if persist {
            doc.last_updated = Utc::now();
            fsio::atomic_replace_json(&self.path, doc)?;
        }
        Ok(out)
    }
}

impl StateStore for FileStateStore {
    /// A project's state, zeroed defaults when the project is unknown.
    ///
    /// Pure read — the default is not inserted into the document until the
    /// first real mutation, so reads never trigger a persist.
    fn get_project_state(&self, project: &str) -> ChronicleResult<ProjectState> {
        self.with_doc(false, |doc| {
            doc.projects.get(project).cloned().unwrap_or_default()
        })
    }

    fn next_sequence_number(&self, project: &str) -> ChronicleResult<u64> {
        Ok(self.get_project_state(project)?.current_sequence + 1)
    }

    fn update_project_state(&self, project: &str, record: &RotationRecord) -> ChronicleResult<()> {
        self.with_doc(true, |doc| {
            let max_ids = doc.global_settings.max_rotations_per_project;
            doc.projects
                .entry(project.to_string())
                .or_default()
                .apply_rotation(record, max_ids);
        })
    }

    fn get_log_stats(&self, project: &str, log_type: &str) -> ChronicleResult<Option<CachedStats>> {
        self.with_doc(false, |doc| {
            doc.projects
                .get(project)
                .and_then(|p| p.log_stats.get(log_type).cloned())
        })
    }

    fn update_log_stats(
        &self,
        project: &str,
        log_type: &str,
        stats: &CachedStats,
    ) -> ChronicleResult<()> {
        self.with_doc(true, |doc| {
            doc.projects
                .entry(project.to_string())
                .or_default()
                .log_stats
                .insert(log_type.to_string(), stats.clone());
        })
    }

    fn cleanup_project_state(&self, project: &str) -> ChronicleResult<bool> {
        self.with_doc(true, |doc| doc.projects.remove(project).is_some())
    }

    fn reset_project_state(&self, project: &str) -> ChronicleResult<()> {
        self.with_doc(true, |doc| {
            doc.projects
                .insert(project.to_string(), ProjectState::default());
        })
    }

    fn list_tracked_projects(&self) -> ChronicleResult<Vec<String>> {
        self.with_doc(false, |doc| doc.projects.keys().cloned().collect())
    }

    fn settings(&self) -> ChronicleResult<GlobalSettings> {
        self.with_doc(false, |doc| doc.global_settings.clone())
    }

    fn update_settings(&self, settings: &GlobalSettings) -> ChronicleResult<()> {
        self.with_doc(true, |doc| {
            doc.global_settings = settings.clone();
        })
    }
}
