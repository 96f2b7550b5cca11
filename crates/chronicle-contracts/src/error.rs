//! Runtime error types for the CHRONICLE rotation core.
//!
//! All fallible operations in the rotation pipeline return `ChronicleResult<T>`.
//! Error variants carry enough context to produce an actionable message, and
//! `suggestion()` maps the common caller mistakes to a corrective hint.

use thiserror::Error;

/// The unified error type for the CHRONICLE runtime.
#[derive(Debug, Error)]
pub enum ChronicleError {
    /// A request carried an illegal parameter combination. Raised before any
    /// file is touched — no partial state exists when this is returned.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The named project has no log directory under the configured root.
    #[error("project '{project}' is not configured")]
    NoProjectConfigured { project: String },

    /// A log file or rotation record that the operation requires is absent.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The filesystem denied access to a path the operation must read or write.
    #[error("access denied: {path}")]
    AccessDenied { path: String },

    /// Any other filesystem failure, wrapping the underlying `io::Error`.
    #[error("i/o failure while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A recomputed file hash disagrees with the stored one.
    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// The append quota for a project is exhausted for the current window.
    #[error("rate limited: retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    /// `custom_metadata` did not parse as a JSON object.
    #[error("invalid metadata: {reason}")]
    InvalidMetadata { reason: String },

    /// The state or audit store could not load or persist its document.
    ///
    /// Covers lock poisoning and persistence context; a rotation that hits
    /// this after the archive write is already durable reports it as a
    /// degraded-write flag instead of raising.
    #[error("store failure: {reason}")]
    StoreFailed { reason: String },

    /// A configuration file is missing a value or could not be parsed.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl ChronicleError {
    /// A plain-language corrective action for caller-fixable failures.
    ///
    /// Returns `None` for failures the caller cannot repair by changing the
    /// request (filesystem errors, store failures).
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ChronicleError::Validation { .. } => {
                Some("pass exactly one of log_type, log_types, or rotate_all")
            }
            ChronicleError::InvalidMetadata { .. } => {
                Some("custom_metadata must be a JSON object, e.g. {\"agent\": \"builder\"}")
            }
            ChronicleError::NoProjectConfigured { .. } => {
                Some("append at least one entry to the project before rotating")
            }
            ChronicleError::RateLimited { .. } => {
                Some("wait retry_after_seconds before appending again")
            }
            _ => None,
        }
    }
}

/// Convenience alias used throughout the CHRONICLE crates.
pub type ChronicleResult<T> = Result<T, ChronicleError>;
