//! The global rotation-state document.
//!
//! Distinct from the audit trail: the trail is a log of what happened, this
//! document is the authoritative pointer state — sequence counters, the hash
//! chain, and cached log statistics. All projects share one physical file;
//! the state store serializes access behind one mutex.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rotation::RotationRecord;

/// On-disk schema version of the state document.
pub const STATE_DOCUMENT_VERSION: u32 = 1;

/// The tamper-evidence chain for one project's archives.
///
/// `root_hash` is set once, on the first rotation, and never changes.
/// `last_hash` is overwritten on every rotation. A verifier holding the
/// archives can recompute the sequence of hashes and prove no archive was
/// inserted, removed, or reordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashChain {
    /// Hash of the first archive ever sealed. Write-once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_hash: Option<String>,
    /// Sequence number of the most recent rotation.
    pub current_sequence: u64,
    /// Hash of the most recent archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_hash: Option<String>,
}

impl HashChain {
    /// Advance the chain to a newly sealed archive.
    ///
    /// The root is only written when unset; the last hash and sequence are
    /// always overwritten.
    pub fn advance(&mut self, sequence: u64, archive_hash: &str) {
        if self.root_hash.is_none() {
            self.root_hash = Some(archive_hash.to_string());
        }
        self.last_hash = Some(archive_hash.to_string());
        self.current_sequence = sequence;
    }
}

/// How a `CachedStats` value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsSource {
    /// A full line count of the file.
    PreciseCount,
    /// Derived from a bytes-per-line tail sample.
    TailSample,
    /// Carried over from a previous document version or an unrecognized
    /// source tag.
    #[serde(other)]
    Carryover,
}

/// Cached size and line statistics for one project/log-type pair.
///
/// Lets the dry-run estimator skip rescanning multi-megabyte logs. The cache
/// is only trusted while the observed `size_bytes`, `mtime_nanos`, and
/// `inode` all still match; any divergence invalidates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedStats {
    pub size_bytes: u64,
    /// Line count at the time of caching, or -1 when never counted precisely.
    pub line_count: i64,
    /// Exponentially weighted bytes-per-line estimate.
    pub ema_bytes_per_line: f64,
    /// Modification time in nanoseconds since the Unix epoch.
    pub mtime_nanos: u64,
    /// Inode of the observed file (0 where the platform has none).
    pub inode: u64,
    pub initialized: bool,
    pub source: StatsSource,
    pub updated_at: DateTime<Utc>,
}

impl CachedStats {
    /// Whether this cache entry still describes the observed file.
    pub fn matches(&self, size_bytes: u64, mtime_nanos: u64, inode: u64) -> bool {
        self.initialized
            && self.size_bytes == size_bytes
            && self.mtime_nanos == mtime_nanos
            && self.inode == inode
    }
}

/// Authoritative rotation state for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    /// Sequence number of the most recent completed rotation (0 = none yet).
    pub current_sequence: u64,
    pub total_rotations: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_rotation_timestamp: Option<DateTime<Utc>>,
    pub hash_chain: HashChain,
    /// Recent rotation ids, oldest trimmed once the configured bound is hit.
    pub rotation_ids: Vec<Uuid>,
    /// Cached statistics keyed by log type.
    #[serde(default)]
    pub log_stats: BTreeMap<String, CachedStats>,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            current_sequence: 0,
            total_rotations: 0,
            last_rotation_timestamp: None,
            hash_chain: HashChain::default(),
            rotation_ids: Vec::new(),
            log_stats: BTreeMap::new(),
        }
    }
}

impl ProjectState {
    /// Fold a completed rotation into this state.
    ///
    /// Sets the sequence from the record, bumps totals, advances the hash
    /// chain, and appends the rotation id, trimming the oldest ids beyond
    /// `max_tracked_ids`.
    pub fn apply_rotation(&mut self, record: &RotationRecord, max_tracked_ids: usize) {
        self.current_sequence = record.sequence_number;
        self.total_rotations += 1;
        self.last_rotation_timestamp = Some(record.rotation_timestamp_utc);
        self.hash_chain.advance(record.sequence_number, &record.file_hash);
        self.rotation_ids.push(record.rotation_uuid);
        if self.rotation_ids.len() > max_tracked_ids {
            let excess = self.rotation_ids.len() - max_tracked_ids;
            self.rotation_ids.drain(..excess);
        }
    }
}

/// Process-wide tunables persisted alongside the per-project states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Bound on `ProjectState::rotation_ids`.
    pub max_rotations_per_project: usize,
    /// Retained-record count that `cleanup_old_rotations` trims a trail to
    /// when no explicit keep count is given.
    pub cleanup_threshold: usize,
    pub hash_chaining_enabled: bool,
    pub integrity_verification_enabled: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            max_rotations_per_project: 50,
            cleanup_threshold: 100,
            hash_chaining_enabled: true,
            integrity_verification_enabled: true,
        }
    }
}

/// The single global state document shared by all projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    pub version: u32,
    pub created_timestamp: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub projects: BTreeMap<String, ProjectState>,
    pub global_settings: GlobalSettings,
}

impl StateDocument {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: STATE_DOCUMENT_VERSION,
            created_timestamp: now,
            last_updated: now,
            projects: BTreeMap::new(),
            global_settings: GlobalSettings::default(),
        }
    }
}

impl Default for StateDocument {
    fn default() -> Self {
        Self::new()
    }
}
