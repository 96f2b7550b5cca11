//! Rotation records, the per-project audit trail document, and integrity
//! verification results.
//!
//! `RotationRecord` is created exactly once per successful rotation and is
//! immutable thereafter. `AuditTrail` is the JSON document the trail store
//! persists — one file per project, append-only except for explicit
//! retention trims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::CustomMetadata;

/// On-disk schema version of the audit trail document.
pub const TRAIL_VERSION: u32 = 1;

/// One sealed archive event.
///
/// Field names match the persisted JSON exactly. `hash_chain_previous` links
/// this record to the archive sealed immediately before it; the first
/// rotation of a project carries `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationRecord {
    /// Unique identity of this rotation event.
    pub rotation_uuid: Uuid,
    /// Wall-clock time (UTC) the live log was sealed.
    pub rotation_timestamp_utc: DateTime<Utc>,
    /// Per-project rotation order, starting at 1 with no gaps.
    pub sequence_number: u64,
    pub archived_file_path: String,
    pub archived_file_name: String,
    /// Newline-terminated records in the sealed file, or -1 if the line
    /// count failed while the hash succeeded.
    pub entry_count: i64,
    /// Lowercase hex SHA-256 of the sealed archive.
    pub file_hash: String,
    pub file_size: u64,
    /// `file_hash` of the previous rotation, absent on the first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_chain_previous: Option<String>,
    /// Opaque caller-supplied annotations, validated as a JSON object at the
    /// request boundary and never interpreted here.
    #[serde(default, skip_serializing_if = "CustomMetadata::is_empty")]
    pub custom_metadata: CustomMetadata,
    /// When the trail store appended this record (stamped by the store).
    pub stored_timestamp: DateTime<Utc>,
}

/// The per-project rotation ledger, persisted as one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrail {
    pub project_name: String,
    pub created_timestamp: DateTime<Utc>,
    /// All recorded rotations, in append order.
    pub rotations: Vec<RotationRecord>,
    /// Count of records ever appended. Not decremented by retention trims,
    /// so it can exceed `rotations.len()`.
    pub total_rotations: u64,
    pub last_updated: DateTime<Utc>,
    pub version: u32,
}

impl AuditTrail {
    /// A fresh, empty trail for `project`.
    pub fn new(project: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            project_name: project.into(),
            created_timestamp: now,
            rotations: Vec::new(),
            total_rotations: 0,
            last_updated: now,
            version: TRAIL_VERSION,
        }
    }

    /// Whether a record with this rotation id is already present.
    pub fn contains(&self, rotation_uuid: &Uuid) -> bool {
        self.rotations.iter().any(|r| r.rotation_uuid == *rotation_uuid)
    }
}

/// Aggregate view over a project's trail, for human-facing summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub project_name: String,
    /// Records currently retained in the trail.
    pub rotation_count: usize,
    /// Records ever appended, including trimmed ones.
    pub total_rotations: u64,
    pub earliest_rotation: Option<DateTime<Utc>>,
    pub latest_rotation: Option<DateTime<Utc>>,
    /// Sum of non-negative entry counts across retained records.
    pub total_archived_entries: u64,
    pub total_archived_bytes: u64,
}

/// Outcome classification of `verify_rotation_integrity`.
///
/// The three failure modes are reported distinctly so callers can tell a
/// missing ledger entry from a deleted archive from actual tampering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    /// Archive exists and its recomputed hash matches the stored one.
    Valid,
    /// No record with the requested id exists in the trail.
    RecordNotFound,
    /// The record exists but the archived file is gone from disk.
    ArchiveMissing,
    /// The archived file exists but hashes to a different value.
    HashMismatch,
}

/// Result of one integrity verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub rotation_uuid: Uuid,
    pub status: IntegrityStatus,
    /// Plain-language explanation suitable for surfacing to a user.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_file_path: Option<String>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.status == IntegrityStatus::Valid
    }
}
