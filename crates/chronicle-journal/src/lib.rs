//! # chronicle-journal
//!
//! The append path of the CHRONICLE runtime: write-ahead durability for
//! in-flight entries and sliding-window rate limiting per project.
//!
//! ## Overview
//!
//! An append is only reported committed after its payload has been (1)
//! staged in a journal colocated with the log and (2) flushed into the
//! canonical log, in that order. On process start `recover_project` replays
//! whatever the previous process staged but never committed. The committed
//! line embeds the journal entry's id, so replay never duplicates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use chronicle_contracts::layout::ProjectLayout;
//! use chronicle_journal::{AppendRateLimiter, LogAppender};
//!
//! let appender = LogAppender::new(
//!     ProjectLayout::new("/var/lib/chronicle"),
//!     AppendRateLimiter::new(60, Duration::from_secs(60)),
//! );
//! appender.recover_project("my-project")?;
//! appender.append("my-project", "progress", "built the parser")?;
//! ```

pub mod append;
pub mod ratelimit;
pub mod wal;

pub use append::{LogAppender, LogLine};
pub use ratelimit::AppendRateLimiter;
pub use wal::DurabilityJournal;

// ── Tests ─────────────────────────────────────────────────────────────────────
