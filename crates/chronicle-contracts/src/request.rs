//! The rotation call contract: request fields and the per-log outcomes the
//! orchestrator returns.
//!
//! These types cross the boundary to the tool-dispatch layer, so their
//! serialized shape is part of the external interface and stays snake_case.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a dry run estimates the entry count.
///
/// Unknown mode strings deserialize to `Estimate` — the cheap path is the
/// safe fallback for forward compatibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DryRunMode {
    /// Full line count of the live file.
    Precise,
    /// Cheap heuristic using cached bytes-per-line.
    #[default]
    #[serde(other)]
    Estimate,
}

/// Where an entry-count estimate sits relative to the auto-rotation
/// threshold.
///
/// Estimates inside the configured band around the threshold are classified
/// `NearThreshold` instead of a hard above/below verdict, so auto-rotation
/// decisions do not oscillate at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdVerdict {
    WellAbove,
    NearThreshold,
    WellBelow,
}

impl ThresholdVerdict {
    /// Classify `estimated` against `threshold` with a symmetric `band`.
    pub fn classify(estimated: u64, threshold: u64, band: u64) -> Self {
        let distance = estimated.abs_diff(threshold);
        if distance <= band {
            ThresholdVerdict::NearThreshold
        } else if estimated > threshold {
            ThresholdVerdict::WellAbove
        } else {
            ThresholdVerdict::WellBelow
        }
    }
}

/// One rotation request, as handed over by the tool-dispatch layer.
///
/// Exactly one of `log_type`, `log_types`, `rotate_all` must be set; the
/// orchestrator validates the combination before any I/O. `confirm = false`
/// degrades the call to a dry run rather than failing it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_types: Option<Vec<String>>,
    #[serde(default)]
    pub rotate_all: bool,
    /// Optional archive-name suffix, at most 64 filesystem-safe characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub dry_run_mode: DryRunMode,
    /// Rotate only when the estimate clears the threshold.
    #[serde(default)]
    pub auto_threshold: bool,
    /// Overrides the configured default threshold (500 entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_entries: Option<u64>,
    /// Raw JSON-object string; validated before any file is touched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_metadata: Option<String>,
}

/// A completed (non-dry-run) rotation of one log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationReport {
    pub rotation_completed: bool,
    pub log_type: String,
    pub rotation_uuid: Uuid,
    pub archive_path: String,
    pub archive_hash: String,
    pub entry_count: i64,
    pub sequence_number: u64,
    pub rotation_duration_seconds: f64,
    /// Whether the archive re-hashed to the live file's digest after the copy.
    pub integrity_verified: bool,
    /// False when the trail write degraded after the archive was sealed.
    pub audit_trail_stored: bool,
    /// False when the state write degraded after the archive was sealed.
    pub state_updated: bool,
}

/// A dry-run preview of what a real rotation would do.
///
/// `file_hash`, `sequence_number`, and `archive_path` are exactly the values
/// a subsequent real rotation of the unchanged log would report — callers
/// rely on dry runs for field-for-field previews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryRunReport {
    pub dry_run: bool,
    pub log_type: String,
    pub mode: DryRunMode,
    pub file_hash: String,
    pub file_size: u64,
    pub entry_count: i64,
    /// The sequence number the next real rotation would be assigned.
    pub sequence_number: u64,
    /// The archive path the next real rotation would create.
    pub archive_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_verdict: Option<ThresholdVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A rotation that was evaluated and intentionally not performed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationSkipped {
    pub log_type: String,
    pub reason: String,
    pub estimated_entries: u64,
    pub threshold_entries: u64,
    pub threshold_verdict: ThresholdVerdict,
}

/// Per-log outcome of one rotation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RotationOutcome {
    Completed(RotationReport),
    DryRun(DryRunReport),
    Skipped(RotationSkipped),
}

/// The full response to one rotation request, covering every targeted log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationResponse {
    pub project: String,
    pub outcomes: Vec<RotationOutcome>,
}
