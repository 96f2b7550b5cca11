//! # chronicle-contracts
//!
//! Shared types, documents, and contracts for the CHRONICLE rotation core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions, path layout, and error types.

pub mod digest;
pub mod error;
pub mod journal;
pub mod layout;
pub mod metadata;
pub mod request;
pub mod rotation;
pub mod state;

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::error::ChronicleError;
    use crate::layout::{is_safe_log_type, project_slug, ProjectLayout};
    use crate::metadata::CustomMetadata;
    use crate::request::{DryRunMode, ThresholdVerdict};
    use crate::rotation::RotationRecord;
    use crate::state::{HashChain, ProjectState};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Build a minimal rotation record with a distinguishable hash.
    fn make_record(sequence: u64, hash: &str) -> RotationRecord {
        RotationRecord {
            rotation_uuid: Uuid::new_v4(),
            rotation_timestamp_utc: Utc::now(),
            sequence_number: sequence,
            archived_file_path: format!("/tmp/archive/progress-{:04}.log", sequence),
            archived_file_name: format!("progress-{:04}.log", sequence),
            entry_count: 3,
            file_hash: hash.to_string(),
            file_size: 128,
            hash_chain_previous: None,
            custom_metadata: CustomMetadata::default(),
            stored_timestamp: Utc::now(),
        }
    }

    // ── CustomMetadata ────────────────────────────────────────────────────────

    /// Absent and empty metadata both mean "no metadata".
    #[test]
    fn metadata_absent_and_empty_are_empty_objects() {
        assert!(CustomMetadata::from_json_str(None).unwrap().is_empty());
        assert!(CustomMetadata::from_json_str(Some("  ")).unwrap().is_empty());
    }

    /// A JSON object parses; its keys are preserved verbatim.
    #[test]
    fn metadata_object_parses() {
        let meta = CustomMetadata::from_json_str(Some(r#"{"agent": "builder", "run": 7}"#)).unwrap();
        assert_eq!(meta.0["agent"], "builder");
        assert_eq!(meta.0["run"], 7);
    }

    /// Truncated JSON fails with `InvalidMetadata`.
    #[test]
    fn metadata_truncated_json_rejected() {
        let err = CustomMetadata::from_json_str(Some("{invalid")).unwrap_err();
        match err {
            ChronicleError::InvalidMetadata { reason } => {
                assert!(reason.contains("not valid JSON"), "unexpected reason: {reason}");
            }
            other => panic!("expected InvalidMetadata, got {:?}", other),
        }
    }

    /// Valid JSON that is not an object is still rejected.
    #[test]
    fn metadata_non_object_json_rejected() {
        for raw in [r#"[1, 2]"#, r#""text""#, "42", "null"] {
            let err = CustomMetadata::from_json_str(Some(raw)).unwrap_err();
            match err {
                ChronicleError::InvalidMetadata { reason } => {
                    assert!(reason.contains("must be a JSON object"), "raw {raw}: {reason}");
                }
                other => panic!("expected InvalidMetadata for {raw}, got {:?}", other),
            }
        }
    }

    // ── DryRunMode ────────────────────────────────────────────────────────────

    /// Known mode strings deserialize to their variants.
    #[test]
    fn dry_run_mode_known_strings() {
        let estimate: DryRunMode = serde_json::from_str(r#""estimate""#).unwrap();
        let precise: DryRunMode = serde_json::from_str(r#""precise""#).unwrap();
        assert_eq!(estimate, DryRunMode::Estimate);
        assert_eq!(precise, DryRunMode::Precise);
    }

    /// Unknown mode strings fall back to the cheap estimate.
    #[test]
    fn dry_run_mode_unknown_falls_back_to_estimate() {
        let mode: DryRunMode = serde_json::from_str(r#""exhaustive""#).unwrap();
        assert_eq!(mode, DryRunMode::Estimate);
    }

    // ── ThresholdVerdict ──────────────────────────────────────────────────────

    /// Estimates inside the band classify as near-threshold from both sides.
    #[test]
    fn threshold_band_classification() {
        assert_eq!(ThresholdVerdict::classify(700, 500, 75), ThresholdVerdict::WellAbove);
        assert_eq!(ThresholdVerdict::classify(560, 500, 75), ThresholdVerdict::NearThreshold);
        assert_eq!(ThresholdVerdict::classify(430, 500, 75), ThresholdVerdict::NearThreshold);
        assert_eq!(ThresholdVerdict::classify(200, 500, 75), ThresholdVerdict::WellBelow);
    }

    /// The band edges are inclusive.
    #[test]
    fn threshold_band_edges_inclusive() {
        assert_eq!(ThresholdVerdict::classify(575, 500, 75), ThresholdVerdict::NearThreshold);
        assert_eq!(ThresholdVerdict::classify(576, 500, 75), ThresholdVerdict::WellAbove);
        assert_eq!(ThresholdVerdict::classify(425, 500, 75), ThresholdVerdict::NearThreshold);
        assert_eq!(ThresholdVerdict::classify(424, 500, 75), ThresholdVerdict::WellBelow);
    }

    // ── HashChain ─────────────────────────────────────────────────────────────

    /// The root hash is written exactly once; the last hash always moves.
    #[test]
    fn hash_chain_root_is_write_once() {
        let mut chain = HashChain::default();
        chain.advance(1, "aaa");
        chain.advance(2, "bbb");
        chain.advance(3, "ccc");

        assert_eq!(chain.root_hash.as_deref(), Some("aaa"));
        assert_eq!(chain.last_hash.as_deref(), Some("ccc"));
        assert_eq!(chain.current_sequence, 3);
    }

    // ── ProjectState ──────────────────────────────────────────────────────────

    /// Applying a rotation advances every pointer field together.
    #[test]
    fn project_state_apply_rotation() {
        let mut state = ProjectState::default();
        state.apply_rotation(&make_record(1, "h1"), 10);
        state.apply_rotation(&make_record(2, "h2"), 10);

        assert_eq!(state.current_sequence, 2);
        assert_eq!(state.total_rotations, 2);
        assert_eq!(state.hash_chain.root_hash.as_deref(), Some("h1"));
        assert_eq!(state.hash_chain.last_hash.as_deref(), Some("h2"));
        assert_eq!(state.rotation_ids.len(), 2);
    }

    /// The rotation id list trims its oldest entries at the bound.
    #[test]
    fn project_state_rotation_ids_bounded() {
        let mut state = ProjectState::default();
        let records: Vec<_> = (1..=5).map(|n| make_record(n, "h")).collect();
        for record in &records {
            state.apply_rotation(record, 3);
        }

        assert_eq!(state.rotation_ids.len(), 3);
        // The three most recent survive, in order.
        let expected: Vec<_> = records[2..].iter().map(|r| r.rotation_uuid).collect();
        assert_eq!(state.rotation_ids, expected);
    }

    // ── Wire format ───────────────────────────────────────────────────────────

    /// Persisted record field names are the snake_case wire names.
    #[test]
    fn rotation_record_wire_field_names() {
        let record = make_record(1, "abc");
        let json = serde_json::to_value(&record).unwrap();

        for field in [
            "rotation_uuid",
            "rotation_timestamp_utc",
            "sequence_number",
            "archived_file_path",
            "archived_file_name",
            "entry_count",
            "file_hash",
            "file_size",
            "stored_timestamp",
        ] {
            assert!(json.get(field).is_some(), "missing wire field {field}");
        }
        // Absent previous-hash and empty metadata are omitted entirely.
        assert!(json.get("hash_chain_previous").is_none());
        assert!(json.get("custom_metadata").is_none());
    }

    // ── Layout ────────────────────────────────────────────────────────────────

    /// Slugs replace every non-alphanumeric character with an underscore.
    #[test]
    fn slug_replaces_non_alphanumerics() {
        assert_eq!(project_slug("my project/v2"), "my_project_v2");
        assert_eq!(project_slug("plain42"), "plain42");
    }

    /// Log-type names are restricted to file-name-safe characters.
    #[test]
    fn log_type_safety() {
        assert!(is_safe_log_type("progress"));
        assert!(is_safe_log_type("bug-reports_2"));
        assert!(!is_safe_log_type(""));
        assert!(!is_safe_log_type("../evil"));
        assert!(!is_safe_log_type("a b"));
    }

    /// Archive names are deterministic in (log type, sequence, suffix).
    #[test]
    fn archive_file_names_deterministic() {
        assert_eq!(
            ProjectLayout::archive_file_name("progress", 7, None),
            "progress-0007.log"
        );
        assert_eq!(
            ProjectLayout::archive_file_name("progress", 7, Some("premerge")),
            "progress-0007-premerge.log"
        );
    }

    /// The journal lives next to the log it protects.
    #[test]
    fn journal_path_is_colocated() {
        let layout = ProjectLayout::new("/data");
        let live = layout.live_log("proj", "progress");
        let journal = ProjectLayout::journal_path(&live);
        assert_eq!(journal.parent(), live.parent());
        assert_eq!(
            journal.file_name().unwrap().to_string_lossy(),
            "progress.log.journal"
        );
    }

    // ── Error surface ─────────────────────────────────────────────────────────

    /// Caller-fixable errors carry a corrective suggestion.
    #[test]
    fn error_suggestions() {
        let validation = ChronicleError::Validation { reason: "conflict".into() };
        assert!(validation.suggestion().is_some());

        let metadata = ChronicleError::InvalidMetadata { reason: "bad".into() };
        assert!(metadata.suggestion().unwrap().contains("JSON object"));

        let io = ChronicleError::Io {
            context: "reading log".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk"),
        };
        assert!(io.suggestion().is_none());
    }

    /// Display messages include the variant context.
    #[test]
    fn error_display_messages() {
        let err = ChronicleError::RateLimited { retry_after_seconds: 12 };
        assert!(err.to_string().contains("12"));

        let err = ChronicleError::HashMismatch {
            path: "/a/b.log".into(),
            expected: "aaa".into(),
            actual: "bbb".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/a/b.log"));
        assert!(msg.contains("aaa"));
        assert!(msg.contains("bbb"));
    }
}
