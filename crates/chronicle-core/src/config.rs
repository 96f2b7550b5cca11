//! TOML-driven runtime configuration.
//!
//! Every tunable the rotation pipeline consults lives here with a compiled-in
//! default, so a missing config file is never an error. Values are grouped in
//! one flat table; a partial file overrides only the keys it names.
//!
//! Example:
//! ```toml
//! max_log_bytes = 10485760
//! default_threshold_entries = 500
//! band_ratio = 0.15
//! append_limit_count = 60
//! append_limit_window_seconds = 60
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use chronicle_contracts::error::{ChronicleError, ChronicleResult};

/// All environment-style tunables consumed by the rotation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChronicleConfig {
    /// Live-log size beyond which status reporting suggests a rotation.
    pub max_log_bytes: u64,

    /// Auto-rotation threshold when the request names none.
    pub default_threshold_entries: u64,

    /// Width of the near-threshold band, as a fraction of the threshold.
    pub band_ratio: f64,

    /// Minimum band width in entries, applied when the ratio-derived band
    /// would be narrower.
    pub band_floor_entries: u64,

    /// Clamp band for the bytes-per-line estimate derived from tail samples.
    pub min_bytes_per_line: f64,
    pub max_bytes_per_line: f64,

    /// How much of the log tail to sample when refreshing bytes-per-line.
    pub tail_sample_bytes: u64,

    /// Weight of the newest observation in the bytes-per-line EMA.
    pub ema_weight: f64,

    /// Append rate limit: `append_limit_count` appends per project per
    /// `append_limit_window_seconds` sliding window.
    pub append_limit_count: u32,
    pub append_limit_window_seconds: u64,

    /// Budget downstream callers should apply to one storage operation.
    /// The core itself imposes no timeout.
    pub storage_timeout_seconds: u64,
}

impl Default for ChronicleConfig {
    fn default() -> Self {
        Self {
            max_log_bytes: 10 * 1024 * 1024,
            default_threshold_entries: 500,
            band_ratio: 0.15,
            band_floor_entries: 25,
            min_bytes_per_line: 20.0,
            max_bytes_per_line: 2048.0,
            tail_sample_bytes: 64 * 1024,
            ema_weight: 0.3,
            append_limit_count: 60,
            append_limit_window_seconds: 60,
            storage_timeout_seconds: 30,
        }
    }
}

impl ChronicleConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> ChronicleResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ChronicleError::Config {
            reason: format!("failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> ChronicleResult<Self> {
        toml::from_str(raw).map_err(|e| ChronicleError::Config {
            reason: format!("failed to parse chronicle config TOML: {}", e),
        })
    }

    /// The near-threshold band width for a given threshold:
    /// `max(band_ratio × threshold, band_floor_entries)`.
    pub fn threshold_band(&self, threshold: u64) -> u64 {
        let ratio_band = (threshold as f64 * self.band_ratio).round() as u64;
        ratio_band.max(self.band_floor_entries)
    }

    /// Clamp a raw bytes-per-line sample into the configured band.
    pub fn clamp_bytes_per_line(&self, raw: f64) -> f64 {
        raw.clamp(self.min_bytes_per_line, self.max_bytes_per_line)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
