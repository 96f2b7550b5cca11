//! # chronicle-state
//!
//! The authoritative rotation-pointer state for the CHRONICLE runtime: one
//! global JSON document holding every project's sequence counter, hash
//! chain, bounded rotation-id list, and cached log statistics.
//!
//! Distinct from the audit trail by design — the trail is a log of events,
//! this is the pointer state a rotation reads and advances. The two are
//! updated in the same orchestrator transaction but fail independently.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chronicle_state::FileStateStore;
//! use chronicle_core::traits::StateStore;
//!
//! let state = FileStateStore::new("/var/lib/chronicle/state.json");
//! let next = state.next_sequence_number("my-project")?;
//! ```

pub mod store;

pub use store::FileStateStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
