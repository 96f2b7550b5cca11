//! End-to-end rotation flows over the real file-backed components:
//! appender + journal, trail store, state store, and the orchestrator,
//! wired exactly as the demo binary wires them.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use chronicle_audit::FileTrailStore;
use chronicle_contracts::{
    error::ChronicleError,
    journal::JournalEntry,
    layout::ProjectLayout,
    request::{DryRunMode, RotationOutcome, RotationRequest},
    rotation::IntegrityStatus,
};
use chronicle_core::{ChronicleConfig, RotationOrchestrator};
use chronicle_journal::{AppendRateLimiter, DurabilityJournal, LogAppender};
use chronicle_state::FileStateStore;

// ── Wiring ────────────────────────────────────────────────────────────────────

struct Stack {
    _dir: TempDir,
    appender: LogAppender,
    orchestrator: RotationOrchestrator,
}

fn stack() -> Stack {
    let dir = TempDir::new().unwrap();
    let layout = ProjectLayout::new(dir.path().join("projects"));
    let trail = FileTrailStore::new(dir.path().join("audit"));
    let state = FileStateStore::new(dir.path().join("state.json"));
    let config = ChronicleConfig::default();

    let appender = LogAppender::new(
        layout.clone(),
        AppendRateLimiter::new(config.append_limit_count, Duration::from_secs(60)),
    );
    let orchestrator =
        RotationOrchestrator::new(Box::new(trail), Box::new(state), layout, config);

    Stack {
        _dir: dir,
        appender,
        orchestrator,
    }
}

fn confirmed(log_type: &str) -> RotationRequest {
    RotationRequest {
        log_type: Some(log_type.to_string()),
        confirm: true,
        ..Default::default()
    }
}

fn completed(outcome: RotationOutcome) -> chronicle_contracts::request::RotationReport {
    match outcome {
        RotationOutcome::Completed(report) => report,
        other => panic!("expected Completed, got {:?}", other),
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

/// Append 3 entries to a fresh project, rotate with confirm=true: count 3,
/// sequence 1, archive on disk, and the ledger's own re-hash agrees.
#[test]
fn append_three_then_rotate() {
    let stack = stack();
    for n in 0..3 {
        stack
            .appender
            .append("agent-x", "progress", &format!("finished task {}", n))
            .unwrap();
    }

    let response = stack.orchestrator.rotate("agent-x", &confirmed("progress")).unwrap();
    let report = completed(response.outcomes.into_iter().next().unwrap());

    assert!(report.rotation_completed);
    assert_eq!(report.entry_count, 3);
    assert_eq!(report.sequence_number, 1);
    assert!(report.integrity_verified);
    assert!(report.audit_trail_stored);
    assert!(report.state_updated);
    assert!(Path::new(&report.archive_path).is_file());

    // The trail's own verification re-hashes the archive and agrees.
    let verification = stack
        .orchestrator
        .trail()
        .verify_rotation_integrity("agent-x", &report.rotation_uuid)
        .unwrap();
    assert_eq!(verification.status, IntegrityStatus::Valid);

    // The live log is empty and ready for new entries.
    let live = stack.orchestrator.layout().live_log("agent-x", "progress");
    assert_eq!(fs::metadata(&live).unwrap().len(), 0);
}

/// Two sequential rotations chain: sequence increments by one and the
/// second record points at the first archive's hash.
#[test]
fn sequential_rotations_chain_across_real_stores() {
    let stack = stack();

    stack.appender.append("agent-x", "progress", "first batch").unwrap();
    let first = completed(
        stack
            .orchestrator
            .rotate("agent-x", &confirmed("progress"))
            .unwrap()
            .outcomes
            .remove(0),
    );

    stack.appender.append("agent-x", "progress", "second batch").unwrap();
    let second = completed(
        stack
            .orchestrator
            .rotate("agent-x", &confirmed("progress"))
            .unwrap()
            .outcomes
            .remove(0),
    );

    assert_eq!(second.sequence_number, first.sequence_number + 1);

    let record = stack
        .orchestrator
        .trail()
        .get_rotation_by_uuid("agent-x", &second.rotation_uuid)
        .unwrap()
        .unwrap();
    assert_eq!(record.hash_chain_previous.as_deref(), Some(first.archive_hash.as_str()));

    // Sequence numbers in the trail are exactly 1..N, no gaps or repeats.
    let mut sequences: Vec<u64> = stack
        .orchestrator
        .trail()
        .get_rotation_history("agent-x", None)
        .unwrap()
        .iter()
        .map(|r| r.sequence_number)
        .collect();
    sequences.sort_unstable();
    assert_eq!(sequences, vec![1, 2]);

    let state = stack.orchestrator.state().get_project_state("agent-x").unwrap();
    assert_eq!(state.hash_chain.current_sequence, 2);
    assert_eq!(state.hash_chain.root_hash.as_deref(), Some(first.archive_hash.as_str()));
    assert_eq!(state.hash_chain.last_hash.as_deref(), Some(second.archive_hash.as_str()));
}

/// A precise dry run previews exactly what the real rotation then reports.
#[test]
fn dry_run_preview_matches_real_rotation() {
    let stack = stack();
    for n in 0..5 {
        stack
            .appender
            .append("agent-x", "progress", &format!("entry {}", n))
            .unwrap();
    }

    let dry = RotationRequest {
        dry_run: true,
        dry_run_mode: DryRunMode::Precise,
        ..confirmed("progress")
    };
    let preview = match stack
        .orchestrator
        .rotate("agent-x", &dry)
        .unwrap()
        .outcomes
        .remove(0)
    {
        RotationOutcome::DryRun(report) => report,
        other => panic!("expected DryRun, got {:?}", other),
    };

    let real = completed(
        stack
            .orchestrator
            .rotate("agent-x", &confirmed("progress"))
            .unwrap()
            .outcomes
            .remove(0),
    );

    assert_eq!(preview.file_hash, real.archive_hash);
    assert_eq!(preview.sequence_number, real.sequence_number);
    assert_eq!(preview.archive_path, real.archive_path);
    assert_eq!(preview.entry_count, real.entry_count);
}

/// Malformed metadata rejects the call before anything exists on disk.
#[test]
fn invalid_metadata_leaves_no_trace() {
    let stack = stack();
    stack.appender.append("agent-x", "progress", "only entry").unwrap();

    let request = RotationRequest {
        custom_metadata: Some("{invalid".to_string()),
        ..confirmed("progress")
    };
    assert!(matches!(
        stack.orchestrator.rotate("agent-x", &request),
        Err(ChronicleError::InvalidMetadata { .. })
    ));

    // Live log intact, no archive directory, empty history, zero sequence.
    let live = stack.orchestrator.layout().live_log("agent-x", "progress");
    assert!(fs::metadata(&live).unwrap().len() > 0);
    assert!(!stack.orchestrator.layout().archive_dir("agent-x").exists());
    assert!(stack
        .orchestrator
        .trail()
        .get_rotation_history("agent-x", None)
        .unwrap()
        .is_empty());
    assert_eq!(
        stack
            .orchestrator
            .state()
            .get_project_state("agent-x")
            .unwrap()
            .current_sequence,
        0
    );
}

/// Entries staged by a crashed process are replayed before rotation and end
/// up inside the sealed archive.
#[test]
fn crash_recovery_feeds_the_next_rotation() {
    let stack = stack();
    stack.appender.append("agent-x", "progress", "committed entry").unwrap();

    // Simulate the crash: one entry staged in the journal, never committed.
    let live = stack.orchestrator.layout().live_log("agent-x", "progress");
    let lost = JournalEntry::new("agent-x", "progress", "staged then crashed");
    DurabilityJournal::for_log(&live).stage(&lost).unwrap();

    assert_eq!(stack.appender.recover_project("agent-x").unwrap(), 1);

    let report = completed(
        stack
            .orchestrator
            .rotate("agent-x", &confirmed("progress"))
            .unwrap()
            .outcomes
            .remove(0),
    );
    assert_eq!(report.entry_count, 2, "the replayed entry must be sealed too");

    let archived = fs::read_to_string(&report.archive_path).unwrap();
    assert!(archived.contains("staged then crashed"));
}

/// Retention trims the trail on disk to the most recent records.
#[test]
fn retention_trims_real_trail() {
    let stack = stack();

    for n in 0..4 {
        stack
            .appender
            .append("agent-x", "progress", &format!("batch {}", n))
            .unwrap();
        completed(
            stack
                .orchestrator
                .rotate("agent-x", &confirmed("progress"))
                .unwrap()
                .outcomes
                .remove(0),
        );
    }

    let removed = stack
        .orchestrator
        .trail()
        .cleanup_old_rotations("agent-x", 2)
        .unwrap();
    assert_eq!(removed, 2);

    let remaining = stack
        .orchestrator
        .trail()
        .get_rotation_history("agent-x", None)
        .unwrap();
    let sequences: Vec<u64> = remaining.iter().map(|r| r.sequence_number).collect();
    assert_eq!(sequences, vec![4, 3]);
}

/// The rate limiter caps the append path end to end.
#[test]
fn rate_limit_guards_append_path() {
    let dir = TempDir::new().unwrap();
    let layout = ProjectLayout::new(dir.path().join("projects"));
    let appender = LogAppender::new(layout, AppendRateLimiter::new(2, Duration::from_secs(60)));

    appender.append("agent-x", "progress", "one").unwrap();
    appender.append("agent-x", "progress", "two").unwrap();
    match appender.append("agent-x", "progress", "three") {
        Err(ChronicleError::RateLimited { retry_after_seconds }) => {
            assert!(retry_after_seconds >= 1);
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
}
