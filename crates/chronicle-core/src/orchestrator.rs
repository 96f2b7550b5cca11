//! The rotation orchestrator: the deterministic seal-and-record pipeline.
//!
//! Every rotation request moves through a fixed state machine:
//!
//!   Validating → Estimating → (DryRunReport | Sealing) → Recording → Completed
//!
//! with `Failed` reachable from any state. The durability invariant is
//! absolute: the live log is only truncated after the archive copy is
//! confirmed on disk, and the ledger/state writes happen strictly after the
//! archive is durable — so a failure late in the pipeline degrades
//! auditability, never data safety.
//!
//! One rotation at a time per project: sequence numbers and the hash chain
//! are not safe under concurrent rotation of the same project, so the whole
//! pipeline runs under a per-project mutex. Different projects rotate
//! concurrently without contention.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use chronicle_contracts::{
    error::{ChronicleError, ChronicleResult},
    layout::{is_safe_log_type, ProjectLayout},
    metadata::CustomMetadata,
    request::{
        DryRunMode, DryRunReport, RotationOutcome, RotationReport, RotationRequest,
        RotationResponse, RotationSkipped, ThresholdVerdict,
    },
    rotation::RotationRecord,
    state::GlobalSettings,
};
use chronicle_integrity::{compute_file_hash, count_lines, fsio, verify};

use crate::config::ChronicleConfig;
use crate::estimate::estimate_entries;
use crate::traits::{StateStore, TrailStore};

/// Longest accepted archive-name suffix.
pub const MAX_SUFFIX_LEN: usize = 64;

// ── Pipeline phases ───────────────────────────────────────────────────────────

/// Where a rotation request currently is. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RotationPhase {
    Validating,
    Estimating,
    DryRunReport,
    Sealing,
    Recording,
    Completed,
}

impl RotationPhase {
    fn as_str(self) -> &'static str {
        match self {
            RotationPhase::Validating => "validating",
            RotationPhase::Estimating => "estimating",
            RotationPhase::DryRunReport => "dry_run_report",
            RotationPhase::Sealing => "sealing",
            RotationPhase::Recording => "recording",
            RotationPhase::Completed => "completed",
        }
    }
}

// ── Validated request plan ────────────────────────────────────────────────────

/// Which logs one request targets.
#[derive(Debug, Clone)]
enum TargetSelector {
    One(String),
    Many(Vec<String>),
    All,
}

/// The outcome of validation: a request normalized into everything the
/// per-log pipeline needs. Building this performs no I/O.
#[derive(Debug, Clone)]
struct RotationPlan {
    targets: TargetSelector,
    suffix: Option<String>,
    metadata: CustomMetadata,
    /// True for explicit dry runs AND for unconfirmed real requests, which
    /// degrade to a dry run instead of failing.
    effective_dry_run: bool,
    mode: DryRunMode,
    auto_threshold: bool,
    threshold: u64,
    /// Set when the request degraded because `confirm` was false.
    note: Option<String>,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// The central coordinator that decides when and how a live log is sealed.
///
/// Owns the trusted stores — the rotation ledger and the pointer state — and
/// is the only component that mutates either. Construct one per process and
/// share it; all internal locking is per-project.
pub struct RotationOrchestrator {
    trail: Box<dyn TrailStore>,
    state: Box<dyn StateStore>,
    layout: ProjectLayout,
    config: ChronicleConfig,
    rotation_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RotationOrchestrator {
    /// Create a new orchestrator over the given stores and log layout.
    pub fn new(
        trail: Box<dyn TrailStore>,
        state: Box<dyn StateStore>,
        layout: ProjectLayout,
        config: ChronicleConfig,
    ) -> Self {
        Self {
            trail,
            state,
            layout,
            config,
            rotation_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The rotation ledger, for history and verification passthrough.
    pub fn trail(&self) -> &dyn TrailStore {
        self.trail.as_ref()
    }

    /// The pointer-state store.
    pub fn state(&self) -> &dyn StateStore {
        self.state.as_ref()
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn config(&self) -> &ChronicleConfig {
        &self.config
    }

    /// Execute one rotation request against `project`.
    ///
    /// # Pipeline
    ///
    /// 1. Validate the parameter combination and metadata JSON — fail fast
    ///    with no side effects on any violation.
    /// 2. Take the project's rotation lock; confirm the project is configured
    ///    and every explicitly named log exists.
    /// 3. Per targeted log: estimate, apply the auto-threshold gate, then
    ///    either report a dry run or seal + record.
    ///
    /// # Errors
    ///
    /// `Validation` / `InvalidMetadata` before any file is touched;
    /// `NoProjectConfigured` when the project directory is absent; `NotFound`
    /// when a named log file is missing; `Io`/`AccessDenied` when the archive
    /// write itself fails (which aborts the rotation with no ledger or state
    /// mutation). A skipped or degraded rotation is NOT an error — it is a
    /// `RotationOutcome` variant.
    pub fn rotate(
        &self,
        project: &str,
        request: &RotationRequest,
    ) -> ChronicleResult<RotationResponse> {
        debug!(project, phase = RotationPhase::Validating.as_str(), "rotation requested");
        let plan = Self::validate(request, &self.config)?;

        let lock = self.project_lock(project)?;
        let _guard = lock.lock().map_err(|_| ChronicleError::StoreFailed {
            reason: format!("rotation lock poisoned for project '{}'", project),
        })?;

        if !self.layout.is_configured(project) {
            return Err(ChronicleError::NoProjectConfigured {
                project: project.to_string(),
            });
        }

        let targets = self.resolve_targets(project, &plan)?;
        let mut outcomes = Vec::with_capacity(targets.len());
        for log_type in &targets {
            outcomes.push(self.rotate_one(project, log_type, &plan)?);
        }

        Ok(RotationResponse {
            project: project.to_string(),
            outcomes,
        })
    }

    // ── Step 1: validation ───────────────────────────────────────────────────

    /// Normalize and validate a request. Performs no I/O; every rejection
    /// leaves the system untouched.
    fn validate(request: &RotationRequest, config: &ChronicleConfig) -> ChronicleResult<RotationPlan> {
        let named_one = request.log_type.is_some();
        let named_many = request.log_types.is_some();
        let selector_count =
            named_one as usize + named_many as usize + request.rotate_all as usize;

        if selector_count == 0 {
            return Err(ChronicleError::Validation {
                reason: "no rotation target: one of log_type, log_types, or rotate_all is required"
                    .to_string(),
            });
        }
        if selector_count > 1 {
            return Err(ChronicleError::Validation {
                reason: "log_type, log_types, and rotate_all are mutually exclusive".to_string(),
            });
        }

        let targets = if let Some(log_type) = &request.log_type {
            Self::check_log_type(log_type)?;
            TargetSelector::One(log_type.clone())
        } else if let Some(log_types) = &request.log_types {
            if log_types.is_empty() {
                return Err(ChronicleError::Validation {
                    reason: "log_types must name at least one log".to_string(),
                });
            }
            let mut seen = std::collections::HashSet::new();
            for log_type in log_types {
                Self::check_log_type(log_type)?;
                if !seen.insert(log_type.as_str()) {
                    return Err(ChronicleError::Validation {
                        reason: format!("log_types names '{}' more than once", log_type),
                    });
                }
            }
            TargetSelector::Many(log_types.clone())
        } else {
            TargetSelector::All
        };

        if let Some(suffix) = &request.suffix {
            if suffix.len() > MAX_SUFFIX_LEN {
                return Err(ChronicleError::Validation {
                    reason: format!(
                        "suffix exceeds {} characters ({} given)",
                        MAX_SUFFIX_LEN,
                        suffix.len()
                    ),
                });
            }
            if !is_safe_log_type(suffix) {
                return Err(ChronicleError::Validation {
                    reason: "suffix may only contain ASCII alphanumerics, '-' and '_'".to_string(),
                });
            }
        }

        let metadata = CustomMetadata::from_json_str(request.custom_metadata.as_deref())?;

        let effective_dry_run = request.dry_run || !request.confirm;
        let note = (!request.confirm && !request.dry_run).then(|| {
            "confirm=true required to perform a non-dry-run rotation; returning dry-run preview"
                .to_string()
        });

        Ok(RotationPlan {
            targets,
            suffix: request.suffix.clone(),
            metadata,
            effective_dry_run,
            mode: request.dry_run_mode,
            auto_threshold: request.auto_threshold,
            threshold: request
                .threshold_entries
                .unwrap_or(config.default_threshold_entries),
            note,
        })
    }

    fn check_log_type(log_type: &str) -> ChronicleResult<()> {
        if !is_safe_log_type(log_type) {
            return Err(ChronicleError::Validation {
                reason: format!(
                    "log type '{}' must be non-empty ASCII alphanumerics, '-' or '_'",
                    log_type
                ),
            });
        }
        Ok(())
    }

    // ── Step 2: target resolution ────────────────────────────────────────────

    /// Resolve the selector to concrete log types, confirming every
    /// explicitly named log exists before anything is sealed.
    fn resolve_targets(&self, project: &str, plan: &RotationPlan) -> ChronicleResult<Vec<String>> {
        match &plan.targets {
            TargetSelector::One(log_type) => {
                self.check_live_log(project, log_type)?;
                Ok(vec![log_type.clone()])
            }
            TargetSelector::Many(log_types) => {
                for log_type in log_types {
                    self.check_live_log(project, log_type)?;
                }
                Ok(log_types.clone())
            }
            TargetSelector::All => {
                let dir = self.layout.project_dir(project);
                let entries = std::fs::read_dir(&dir).map_err(|e| ChronicleError::Io {
                    context: format!("listing {}", dir.display()),
                    source: e,
                })?;

                let mut found: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_file())
                    .filter_map(|e| {
                        let name = e.file_name().to_string_lossy().into_owned();
                        name.strip_suffix(".log").map(str::to_string)
                    })
                    .filter(|stem| is_safe_log_type(stem))
                    .collect();
                found.sort();
                Ok(found)
            }
        }
    }

    fn check_live_log(&self, project: &str, log_type: &str) -> ChronicleResult<()> {
        let live = self.layout.live_log(project, log_type);
        if !live.is_file() {
            return Err(ChronicleError::NotFound {
                what: format!("log file {}", live.display()),
            });
        }
        Ok(())
    }

    // ── Step 3: the per-log pipeline ─────────────────────────────────────────

    fn rotate_one(
        &self,
        project: &str,
        log_type: &str,
        plan: &RotationPlan,
    ) -> ChronicleResult<RotationOutcome> {
        let live = self.layout.live_log(project, log_type);

        // ── Estimating ────────────────────────────────────────────────────
        debug!(project, log_type, phase = RotationPhase::Estimating.as_str(), "estimating entries");

        let cached = self.state.get_log_stats(project, log_type).unwrap_or_else(|e| {
            warn!(project, log_type, error = %e, "log stats read failed, estimating cold");
            None
        });
        let estimate = estimate_entries(&live, cached.as_ref(), &self.config)?;
        if let Some(stats) = &estimate.refreshed_stats {
            if let Err(e) = self.state.update_log_stats(project, log_type, stats) {
                warn!(project, log_type, error = %e, "log stats cache write failed");
            }
        }

        let verdict = if plan.auto_threshold {
            let band = self.config.threshold_band(plan.threshold);
            let verdict =
                ThresholdVerdict::classify(estimate.estimated_entries, plan.threshold, band);
            if verdict != ThresholdVerdict::WellAbove {
                info!(
                    project,
                    log_type,
                    estimated = estimate.estimated_entries,
                    threshold = plan.threshold,
                    verdict = ?verdict,
                    "rotation skipped under auto threshold"
                );
                let reason = match verdict {
                    ThresholdVerdict::NearThreshold => {
                        "estimate within the threshold band; deferring to avoid oscillation"
                    }
                    _ => "estimate below threshold",
                };
                return Ok(RotationOutcome::Skipped(RotationSkipped {
                    log_type: log_type.to_string(),
                    reason: reason.to_string(),
                    estimated_entries: estimate.estimated_entries,
                    threshold_entries: plan.threshold,
                    threshold_verdict: verdict,
                }));
            }
            Some(verdict)
        } else {
            None
        };

        let next_sequence = self.state.next_sequence_number(project)?;
        let archive_path =
            self.layout
                .archive_path(project, log_type, next_sequence, plan.suffix.as_deref());

        // ── Dry run ───────────────────────────────────────────────────────
        //
        // Reads only. The preview must match what a real rotation of this
        // exact log state would report, field for field.
        if plan.effective_dry_run {
            debug!(project, log_type, phase = RotationPhase::DryRunReport.as_str(), "dry run");

            let digest = compute_file_hash(&live)?;
            let entry_count = match plan.mode {
                DryRunMode::Precise => count_lines(&live)? as i64,
                DryRunMode::Estimate => estimate.estimated_entries as i64,
            };

            return Ok(RotationOutcome::DryRun(DryRunReport {
                dry_run: true,
                log_type: log_type.to_string(),
                mode: plan.mode,
                file_hash: digest.hash,
                file_size: digest.size_bytes,
                entry_count,
                sequence_number: next_sequence,
                archive_path: archive_path.display().to_string(),
                threshold_verdict: verdict,
                note: plan.note.clone(),
            }));
        }

        // ── Sealing ───────────────────────────────────────────────────────
        let started = Instant::now();
        info!(
            project,
            log_type,
            sequence = next_sequence,
            phase = RotationPhase::Sealing.as_str(),
            "sealing live log"
        );

        let digest = compute_file_hash(&live)?;
        let entry_count = match count_lines(&live) {
            Ok(n) => n as i64,
            Err(e) => {
                warn!(project, log_type, error = %e, "line count failed, recording -1");
                -1
            }
        };

        let settings = self.state.settings().unwrap_or_else(|e| {
            warn!(error = %e, "settings read failed, using defaults");
            GlobalSettings::default()
        });
        let previous = if settings.hash_chaining_enabled {
            self.state.get_project_state(project)?.hash_chain.last_hash
        } else {
            None
        };

        let record = RotationRecord {
            rotation_uuid: Uuid::new_v4(),
            rotation_timestamp_utc: Utc::now(),
            sequence_number: next_sequence,
            archived_file_path: archive_path.display().to_string(),
            archived_file_name: ProjectLayout::archive_file_name(
                log_type,
                next_sequence,
                plan.suffix.as_deref(),
            ),
            entry_count,
            file_hash: digest.hash.clone(),
            file_size: digest.size_bytes,
            hash_chain_previous: previous,
            custom_metadata: plan.metadata.clone(),
            stored_timestamp: Utc::now(),
        };

        // The one hard failure point: if the archive copy fails, the whole
        // rotation aborts here — live log intact, no ledger or state write.
        fsio::archive_live_log(&live, &archive_path)?;

        let integrity_verified = if settings.integrity_verification_enabled {
            match verify(&archive_path, &digest.hash) {
                Ok((valid, actual)) => {
                    if !valid {
                        warn!(
                            project,
                            log_type,
                            expected = %digest.hash,
                            actual = %actual,
                            "archive hash diverged from live digest"
                        );
                    }
                    valid
                }
                Err(e) => {
                    warn!(project, log_type, error = %e, "archive re-hash failed");
                    false
                }
            }
        } else {
            false
        };

        // ── Recording ─────────────────────────────────────────────────────
        //
        // The archive is durable; from here every failure is a degraded
        // write reported as a flag, never a reversal.
        debug!(project, log_type, phase = RotationPhase::Recording.as_str(), "recording rotation");

        let audit_trail_stored = self.trail.store_rotation_metadata(project, &record);
        if !audit_trail_stored {
            warn!(
                project,
                log_type,
                rotation_uuid = %record.rotation_uuid,
                "audit trail write degraded after seal"
            );
        }

        let state_updated = match self.state.update_project_state(project, &record) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    project,
                    log_type,
                    rotation_uuid = %record.rotation_uuid,
                    error = %e,
                    "state update degraded after seal"
                );
                false
            }
        };

        info!(
            project,
            log_type,
            rotation_uuid = %record.rotation_uuid,
            sequence = next_sequence,
            phase = RotationPhase::Completed.as_str(),
            "rotation completed"
        );

        Ok(RotationOutcome::Completed(RotationReport {
            rotation_completed: true,
            log_type: log_type.to_string(),
            rotation_uuid: record.rotation_uuid,
            archive_path: record.archived_file_path.clone(),
            archive_hash: record.file_hash.clone(),
            entry_count,
            sequence_number: next_sequence,
            rotation_duration_seconds: started.elapsed().as_secs_f64(),
            integrity_verified,
            audit_trail_stored,
            state_updated,
        }))
    }

    fn project_lock(&self, project: &str) -> ChronicleResult<Arc<Mutex<()>>> {
        let mut locks = self
            .rotation_locks
            .lock()
            .map_err(|_| ChronicleError::StoreFailed {
                reason: "rotation lock table poisoned".to_string(),
            })?;
        Ok(locks.entry(project.to_string()).or_default().clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
