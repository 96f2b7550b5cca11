//! # chronicle-audit
//!
//! The per-project rotation ledger for the CHRONICLE runtime.
//!
//! ## Overview
//!
//! Every sealed archive is recorded exactly once in the project's
//! `AuditTrail` — one JSON document per project, written atomically via
//! temp-file-then-rename. The ledger is the human-facing history; the hash
//! chain in the state document is the tamper-evidence mechanism, which is
//! why a corrupted ledger restarts fresh instead of blocking rotation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chronicle_audit::FileTrailStore;
//! use chronicle_core::traits::TrailStore;
//!
//! let trail = FileTrailStore::new("/var/lib/chronicle/audit");
//! let stored = trail.store_rotation_metadata("my-project", &record);
//! let history = trail.get_rotation_history("my-project", Some(20))?;
//! ```

pub mod store;

pub use store::FileTrailStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
