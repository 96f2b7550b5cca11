//! # chronicle-core
//!
//! The rotation pipeline for the CHRONICLE runtime.
//!
//! This crate provides:
//! - The two store traits (`TrailStore`, `StateStore`) the orchestrator
//!   writes through
//! - The `RotationOrchestrator` that seals live logs into hash-chained
//!   archives in the correct durability order
//! - `ChronicleConfig`, the TOML-driven tunables
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chronicle_core::{RotationOrchestrator, ChronicleConfig};
//! use chronicle_core::traits::{TrailStore, StateStore};
//! ```

pub mod config;
pub mod estimate;
pub mod orchestrator;
pub mod traits;

pub use config::ChronicleConfig;
pub use orchestrator::{RotationOrchestrator, MAX_SUFFIX_LEN};
