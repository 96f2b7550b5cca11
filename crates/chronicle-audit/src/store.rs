//! File-backed implementation of `TrailStore`.
//!
//! One JSON document per project, filename derived from the project slug.
//! Every mutation is written to a temp file and atomically renamed over the
//! live document. A trail that fails to parse is treated as lost and
//! restarted fresh — rotation durability must not depend on an unbroken
//! chain of audit records; the hash chain in the state document is the
//! tamper-evidence mechanism.
//!
//! Locking is per project: one JSON document per project means unrelated
//! projects never contend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use chronicle_contracts::{
    error::{ChronicleError, ChronicleResult},
    layout::project_slug,
    rotation::{AuditSummary, AuditTrail, IntegrityReport, IntegrityStatus, RotationRecord},
};
use chronicle_core::traits::TrailStore;
use chronicle_integrity::fsio;

/// The rotation ledger, one JSON file per project under one directory.
pub struct FileTrailStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileTrailStore {
    /// Create a store rooted at `dir`. The directory is created on first
    /// write, not here — construction never touches the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The document path for a project: slug plus `.json`.
    pub fn trail_path(&self, project: &str) -> PathBuf {
        self.dir.join(format!("{}.json", project_slug(project)))
    }

    fn project_lock(&self, project: &str) -> ChronicleResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| ChronicleError::StoreFailed {
            reason: "audit lock table poisoned".to_string(),
        })?;
        Ok(locks.entry(project.to_string()).or_default().clone())
    }

    /// Load the project's trail, or start a fresh one.
    ///
    /// Any load failure — absent file, unreadable file, corrupted JSON — is
    /// "trail lost, start fresh", logged but never fatal.
    fn load_or_create(&self, project: &str) -> AuditTrail {
        let path = self.trail_path(project);
        match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<AuditTrail>(&bytes) {
                Ok(trail) => trail,
                Err(e) => {
                    warn!(
                        project,
                        path = %path.display(),
                        error = %e,
                        "audit trail corrupted, starting fresh"
                    );
                    AuditTrail::new(project)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AuditTrail::new(project),
            Err(e) => {
                warn!(
                    project,
                    path = %path.display(),
                    error = %e,
                    "audit trail unreadable, starting fresh"
                );
                AuditTrail::new(project)
            }
        }
    }

    fn persist(&self, project: &str, trail: &AuditTrail) -> ChronicleResult<()> {
        fsio::atomic_replace_json(&self.trail_path(project), trail)
    }
}

impl TrailStore for FileTrailStore {
    /// Append one record, stamping `stored_timestamp` and `last_updated`.
    ///
    /// Never raises past the write boundary: any failure is logged and
    /// reported as `false`, because by the time this runs the archive is
    /// already sealed. Re-storing an already-present rotation id is a no-op
    /// that reports success.
    fn store_rotation_metadata(&self, project: &str, record: &RotationRecord) -> bool {
        let lock = match self.project_lock(project) {
            Ok(lock) => lock,
            Err(e) => {
                warn!(project, error = %e, "audit lock unavailable");
                return false;
            }
        };
        let guard = lock.lock();
        if guard.is_err() {
            warn!(project, "audit document lock poisoned");
            return false;
        }

        let mut trail = self.load_or_create(project);
        if trail.contains(&record.rotation_uuid) {
            debug!(project, rotation_uuid = %record.rotation_uuid, "rotation already recorded");
            return true;
        }

        let mut stored = record.clone();
        stored.stored_timestamp = Utc::now();
        trail.rotations.push(stored);
        trail.total_rotations += 1;
        trail.last_updated = Utc::now();

        match self.persist(project, &trail) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    project,
                    rotation_uuid = %record.rotation_uuid,
                    error = %e,
                    "audit trail write failed"
                );
                false
            }
        }
    }

    fn get_rotation_history(
        &self,
        project: &str,
        limit: Option<usize>,
    ) -> ChronicleResult<Vec<RotationRecord>> {
        let lock = self.project_lock(project)?;
        let _guard = lock.lock().map_err(|_| ChronicleError::StoreFailed {
            reason: format!("audit document lock poisoned for '{}'", project),
        })?;

        let mut records = self.load_or_create(project).rotations;
        records.sort_by(|a, b| b.rotation_timestamp_utc.cmp(&a.rotation_timestamp_utc));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    fn get_rotation_by_uuid(
        &self,
        project: &str,
        rotation_uuid: &Uuid,
    ) -> ChronicleResult<Option<RotationRecord>> {
        let lock = self.project_lock(project)?;
        let _guard = lock.lock().map_err(|_| ChronicleError::StoreFailed {
            reason: format!("audit document lock poisoned for '{}'", project),
        })?;

        Ok(self
            .load_or_create(project)
            .rotations
            .into_iter()
            .find(|r| r.rotation_uuid == *rotation_uuid))
    }

    fn verify_rotation_integrity(
        &self,
        project: &str,
        rotation_uuid: &Uuid,
    ) -> ChronicleResult<IntegrityReport> {
        let record = match self.get_rotation_by_uuid(project, rotation_uuid)? {
            Some(record) => record,
            None => {
                return Ok(IntegrityReport {
                    rotation_uuid: *rotation_uuid,
                    status: IntegrityStatus::RecordNotFound,
                    message: format!("no rotation record {} in project '{}'", rotation_uuid, project),
                    archived_file_path: None,
                })
            }
        };

        let archive = Path::new(&record.archived_file_path);
        if !archive.is_file() {
            return Ok(IntegrityReport {
                rotation_uuid: *rotation_uuid,
                status: IntegrityStatus::ArchiveMissing,
                message: format!("archived file {} is missing from disk", archive.display()),
                archived_file_path: Some(record.archived_file_path),
            });
        }

        let (valid, actual) = chronicle_integrity::verify(archive, &record.file_hash)?;
        let report = if valid {
            IntegrityReport {
                rotation_uuid: *rotation_uuid,
                status: IntegrityStatus::Valid,
                message: "archive hash matches the recorded value".to_string(),
                archived_file_path: Some(record.archived_file_path),
            }
        } else {
            IntegrityReport {
                rotation_uuid: *rotation_uuid,
                status: IntegrityStatus::HashMismatch,
                message: format!(
                    "archive hashes to {}, but {} was recorded",
                    actual, record.file_hash
                ),
                archived_file_path: Some(record.archived_file_path),
            }
        };
        Ok(report)
    }

    fn cleanup_old_rotations(&self, project: &str, keep_count: usize) -> ChronicleResult<usize> {
        let lock = self.project_lock(project)?;
        let _guard = lock.lock().map_err(|_| ChronicleError::StoreFailed {
            reason: format!("audit document lock poisoned for '{}'", project),
        })?;

        let mut trail = self.load_or_create(project);
        if trail.rotations.len() <= keep_count {
            return Ok(0);
        }

        // Oldest first, then drop everything before the keep window.
        trail.rotations.sort_by_key(|r| r.rotation_timestamp_utc);
        let removed = trail.rotations.len() - keep_count;
        trail.rotations.drain(..removed);
        trail.last_updated = Utc::now();
        self.persist(project, &trail)?;

        debug!(project, removed, kept = keep_count, "audit trail trimmed");
        Ok(removed)
    }

    fn get_audit_summary(&self, project: &str) -> ChronicleResult<AuditSummary> {
        let lock = self.project_lock(project)?;
        let _guard = lock.lock().map_err(|_| ChronicleError::StoreFailed {
            reason: format!("audit document lock poisoned for '{}'", project),
        })?;

        let trail = self.load_or_create(project);
        Ok(AuditSummary {
            project_name: trail.project_name.clone(),
            rotation_count: trail.rotations.len(),
            total_rotations: trail.total_rotations,
            earliest_rotation: trail.rotations.iter().map(|r| r.rotation_timestamp_utc).min(),
            latest_rotation: trail.rotations.iter().map(|r| r.rotation_timestamp_utc).max(),
            total_archived_entries: trail
                .rotations
                .iter()
                .filter(|r| r.entry_count >= 0)
                .map(|r| r.entry_count as u64)
                .sum(),
            total_archived_bytes: trail.rotations.iter().map(|r| r.file_size).sum(),
        })
    }
}
