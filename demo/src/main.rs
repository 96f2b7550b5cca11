//! CHRONICLE — Rotation Core Demo CLI
//!
//! Drives the real CHRONICLE components (appender, trail store, state store,
//! rotation orchestrator) against a local data directory, standing in for
//! the protocol-facing tool-dispatch layer.
//!
//! Usage:
//!   cargo run -p demo -- append --project agent-x --entry "built the parser"
//!   cargo run -p demo -- rotate --project agent-x --confirm
//!   cargo run -p demo -- rotate --project agent-x --dry-run --mode precise
//!   cargo run -p demo -- history --project agent-x --limit 10
//!   cargo run -p demo -- verify --project agent-x --rotation-id <uuid>
//!   cargo run -p demo -- status --project agent-x

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use chronicle_audit::FileTrailStore;
use chronicle_contracts::{
    error::{ChronicleError, ChronicleResult},
    layout::ProjectLayout,
    request::{DryRunMode, RotationRequest},
};
use chronicle_core::{ChronicleConfig, RotationOrchestrator};
use chronicle_journal::{AppendRateLimiter, LogAppender};
use chronicle_state::FileStateStore;

// ── CLI definition ────────────────────────────────────────────────────────────

/// CHRONICLE — append-only progress logs with hash-chained rotation.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "CHRONICLE rotation core demo",
    long_about = "Appends agent progress entries to durable per-project logs and\n\
                  rotates them into sealed, SHA-256 hash-chained archives."
)]
struct Cli {
    /// Data directory holding project logs, archives, and state.
    #[arg(long, global = true, default_value = ".chronicle")]
    data_dir: PathBuf,

    /// Optional TOML config file overriding the compiled-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append one timestamped entry to a project log.
    Append {
        #[arg(long)]
        project: String,
        #[arg(long)]
        entry: String,
        #[arg(long, default_value = "progress")]
        log_type: String,
    },
    /// Rotate a project's log(s) into sealed archives.
    Rotate {
        #[arg(long)]
        project: String,
        /// Rotate one named log type (default when --all is not given).
        #[arg(long, default_value = "progress")]
        log_type: String,
        /// Rotate every log in the project instead of one log type.
        #[arg(long)]
        all: bool,
        /// Perform the rotation for real. Without this the call degrades to
        /// a dry-run preview.
        #[arg(long)]
        confirm: bool,
        /// Preview without sealing anything.
        #[arg(long)]
        dry_run: bool,
        /// Dry-run estimator: "estimate" (cheap) or "precise" (full count).
        #[arg(long, default_value = "estimate")]
        mode: String,
        /// Archive-name suffix (64 filesystem-safe characters max).
        #[arg(long)]
        suffix: Option<String>,
        /// JSON-object metadata stored with the rotation record.
        #[arg(long)]
        metadata: Option<String>,
        /// Rotate only if the estimated entry count clears the threshold.
        #[arg(long)]
        auto_threshold: bool,
        /// Entry threshold for --auto-threshold (default from config: 500).
        #[arg(long)]
        threshold: Option<u64>,
    },
    /// Show a project's rotation history, newest first.
    History {
        #[arg(long)]
        project: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Re-hash one archived rotation and compare against the ledger.
    Verify {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rotation_id: Uuid,
    },
    /// Summarize a project: pointer state, audit totals, live log sizes.
    Status {
        #[arg(long)]
        project: String,
    },
    /// Replay any write-ahead journal entries left by a crash.
    Recover {
        #[arg(long)]
        project: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging to stderr; set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    let runtime = Runtime::new(&cli.data_dir, config);

    let result = match cli.command {
        Command::Append { project, entry, log_type } => runtime.append(&project, &log_type, &entry),
        Command::Rotate {
            project,
            log_type,
            all,
            confirm,
            dry_run,
            mode,
            suffix,
            metadata,
            auto_threshold,
            threshold,
        } => runtime.rotate(
            &project,
            RotationRequest {
                log_type: (!all).then_some(log_type),
                log_types: None,
                rotate_all: all,
                suffix,
                confirm,
                dry_run,
                dry_run_mode: parse_mode(&mode),
                auto_threshold,
                threshold_entries: threshold,
                custom_metadata: metadata,
            },
        ),
        Command::History { project, limit } => runtime.history(&project, limit),
        Command::Verify { project, rotation_id } => runtime.verify(&project, &rotation_id),
        Command::Status { project } => runtime.status(&project),
        Command::Recover { project } => runtime.recover(&project),
    };

    match result {
        Ok(output) => println!("{}", serde_json::to_string_pretty(&output).unwrap()),
        Err(e) => fail(&e),
    }
}

fn fail(error: &ChronicleError) -> ! {
    let mut body = json!({ "ok": false, "error": error.to_string() });
    if let Some(suggestion) = error.suggestion() {
        body["suggestion"] = json!(suggestion);
    }
    eprintln!("{}", serde_json::to_string_pretty(&body).unwrap());
    std::process::exit(1);
}

fn load_config(cli: &Cli) -> ChronicleResult<ChronicleConfig> {
    match &cli.config {
        Some(path) => ChronicleConfig::from_file(path),
        None => Ok(ChronicleConfig::default()),
    }
}

/// Unknown mode strings fall back to the cheap estimate.
fn parse_mode(raw: &str) -> DryRunMode {
    match raw {
        "precise" => DryRunMode::Precise,
        _ => DryRunMode::Estimate,
    }
}

// ── Runtime wiring ────────────────────────────────────────────────────────────

/// The wired-together CHRONICLE components, as the dispatch layer would
/// construct them: one appender, one orchestrator, per process.
struct Runtime {
    appender: LogAppender,
    orchestrator: RotationOrchestrator,
}

impl Runtime {
    fn new(data_dir: &std::path::Path, config: ChronicleConfig) -> Self {
        let layout = ProjectLayout::new(data_dir.join("projects"));
        let trail = FileTrailStore::new(data_dir.join("audit"));
        let state = FileStateStore::new(data_dir.join("state.json"));

        let appender = LogAppender::new(
            layout.clone(),
            AppendRateLimiter::new(
                config.append_limit_count,
                Duration::from_secs(config.append_limit_window_seconds),
            ),
        );
        let orchestrator =
            RotationOrchestrator::new(Box::new(trail), Box::new(state), layout, config);

        Self { appender, orchestrator }
    }

    fn append(&self, project: &str, log_type: &str, entry: &str) -> ChronicleResult<serde_json::Value> {
        let entry_id = self.appender.append(project, log_type, entry)?;
        Ok(json!({
            "ok": true,
            "project": project,
            "log_type": log_type,
            "entry_id": entry_id,
        }))
    }

    fn rotate(&self, project: &str, request: RotationRequest) -> ChronicleResult<serde_json::Value> {
        let response = self.orchestrator.rotate(project, &request)?;
        Ok(json!({
            "ok": true,
            "project": response.project,
            "outcomes": response.outcomes,
        }))
    }

    fn history(&self, project: &str, limit: Option<usize>) -> ChronicleResult<serde_json::Value> {
        let rotations = self.orchestrator.trail().get_rotation_history(project, limit)?;
        Ok(json!({
            "ok": true,
            "project": project,
            "rotation_count": rotations.len(),
            "rotations": rotations,
        }))
    }

    fn verify(&self, project: &str, rotation_id: &Uuid) -> ChronicleResult<serde_json::Value> {
        let report = self
            .orchestrator
            .trail()
            .verify_rotation_integrity(project, rotation_id)?;
        Ok(json!({
            "ok": true,
            "project": project,
            "integrity_valid": report.is_valid(),
            "report": report,
        }))
    }

    fn status(&self, project: &str) -> ChronicleResult<serde_json::Value> {
        let state = self.orchestrator.state().get_project_state(project)?;
        let summary = self.orchestrator.trail().get_audit_summary(project)?;

        // Live log sizes, with a rotation hint against the configured cap.
        let mut logs = serde_json::Map::new();
        let dir = self.orchestrator.layout().project_dir(project);
        if dir.is_dir() {
            let entries = std::fs::read_dir(&dir).map_err(|e| ChronicleError::Io {
                context: format!("listing {}", dir.display()),
                source: e,
            })?;
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                if let Some(log_type) = name.as_deref().and_then(|n| n.strip_suffix(".log")) {
                    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                    logs.insert(
                        log_type.to_string(),
                        json!({
                            "size_bytes": size,
                            "rotation_suggested": size > self.orchestrator.config().max_log_bytes,
                        }),
                    );
                }
            }
        }

        Ok(json!({
            "ok": true,
            "project": project,
            "current_sequence": state.current_sequence,
            "total_rotations": state.total_rotations,
            "hash_chain": state.hash_chain,
            "audit": summary,
            "live_logs": logs,
        }))
    }

    fn recover(&self, project: &str) -> ChronicleResult<serde_json::Value> {
        let replayed = self.appender.recover_project(project)?;
        Ok(json!({
            "ok": true,
            "project": project,
            "entries_replayed": replayed,
        }))
    }
}
