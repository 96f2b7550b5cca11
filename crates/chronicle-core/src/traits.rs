//! Core trait definitions for the CHRONICLE rotation pipeline.
//!
//! These two traits define the orchestrator's write boundary:
//!
//! - `TrailStore` — the append-only rotation ledger (human-facing history)
//! - `StateStore` — the authoritative pointer state (sequence + hash chain)
//!
//! The orchestrator is the ONLY component that mutates either store, and it
//! does so in a fixed order: trail first, state second, both after the
//! archive is already durable. Implementations own their internal locking;
//! callers never synchronize around them.

use uuid::Uuid;

use chronicle_contracts::{
    error::ChronicleResult,
    rotation::{AuditSummary, IntegrityReport, RotationRecord},
    state::{CachedStats, GlobalSettings, ProjectState},
};

/// The per-project rotation ledger.
///
/// One JSON document per project. Append-only from the runtime's
/// perspective — records are never modified, and only `cleanup_old_rotations`
/// removes them (oldest first, by explicit retention request).
pub trait TrailStore: Send + Sync {
    /// Append one rotation record to the project's trail.
    ///
    /// Returns `false` instead of raising when the write fails: by the time
    /// this is called the archive is already sealed, and rotation must not
    /// be aborted retroactively because the ledger write degraded. The
    /// archive itself remains the source of truth. Appending a rotation id
    /// the trail already holds is a no-op that returns `true`.
    fn store_rotation_metadata(&self, project: &str, record: &RotationRecord) -> bool;

    /// Recorded rotations sorted by timestamp descending, newest first,
    /// truncated to `limit` when given.
    fn get_rotation_history(
        &self,
        project: &str,
        limit: Option<usize>,
    ) -> ChronicleResult<Vec<RotationRecord>>;

    /// Look up a single record by rotation id.
    fn get_rotation_by_uuid(
        &self,
        project: &str,
        rotation_uuid: &Uuid,
    ) -> ChronicleResult<Option<RotationRecord>>;

    /// Confirm the archived file behind a record still exists and still
    /// hashes to its recorded value.
    ///
    /// The three failure modes — record missing, archive deleted, hash
    /// mismatch — are reported distinctly in the returned report.
    fn verify_rotation_integrity(
        &self,
        project: &str,
        rotation_uuid: &Uuid,
    ) -> ChronicleResult<IntegrityReport>;

    /// Trim the trail to the `keep_count` most recent records by timestamp.
    /// Returns how many records were removed.
    fn cleanup_old_rotations(&self, project: &str, keep_count: usize) -> ChronicleResult<usize>;

    /// Aggregate counts and extremes over the project's trail.
    fn get_audit_summary(&self, project: &str) -> ChronicleResult<AuditSummary>;
}

/// The authoritative rotation-pointer state, shared by all projects in one
/// document.
///
/// Every mutation persists before returning. Implementations hold one
/// document-level mutex; callers compute outside it and only enter for the
/// read-modify-write.
pub trait StateStore: Send + Sync {
    /// The project's current state, lazily created zeroed.
    fn get_project_state(&self, project: &str) -> ChronicleResult<ProjectState>;

    /// `current_sequence + 1` — a preview, not a reservation. Safe only
    /// under the orchestrator's per-project rotation lock, which is why no
    /// two rotations of the same project ever run concurrently.
    fn next_sequence_number(&self, project: &str) -> ChronicleResult<u64>;

    /// Fold a completed rotation into the project's state and persist.
    fn update_project_state(&self, project: &str, record: &RotationRecord) -> ChronicleResult<()>;

    /// Cached size/line statistics for one log type, if any.
    fn get_log_stats(&self, project: &str, log_type: &str) -> ChronicleResult<Option<CachedStats>>;

    /// Replace the cached statistics for one log type and persist.
    fn update_log_stats(
        &self,
        project: &str,
        log_type: &str,
        stats: &CachedStats,
    ) -> ChronicleResult<()>;

    /// Drop the project from the document entirely. Returns whether it was
    /// present.
    fn cleanup_project_state(&self, project: &str) -> ChronicleResult<bool>;

    /// Zero the project's state in place (sequence, chain, ids, stats).
    fn reset_project_state(&self, project: &str) -> ChronicleResult<()>;

    /// Names of all projects the document currently tracks.
    fn list_tracked_projects(&self) -> ChronicleResult<Vec<String>>;

    /// The process-wide settings block.
    fn settings(&self) -> ChronicleResult<GlobalSettings>;

    /// Replace the settings block and persist.
    fn update_settings(&self, settings: &GlobalSettings) -> ChronicleResult<()>;
}
