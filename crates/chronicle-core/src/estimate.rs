//! Cheap entry-count estimation for rotation decisions.
//!
//! The estimator avoids rescanning multi-megabyte logs on every call by
//! trusting `CachedStats` while the observed (size, mtime, inode) triple
//! still matches. On divergence it refreshes bytes-per-line from a tail
//! sample, folds the sample into an EMA, and derives the estimate from the
//! file size.

use std::path::Path;

use chrono::Utc;
use tracing::debug;

use chronicle_contracts::error::{ChronicleError, ChronicleResult};
use chronicle_contracts::state::{CachedStats, StatsSource};
use chronicle_integrity::fsio;

use crate::config::ChronicleConfig;

/// The observed identity of a file, used for cache invalidation.
#[derive(Debug, Clone, Copy)]
pub struct FileObservation {
    pub size_bytes: u64,
    pub mtime_nanos: u64,
    pub inode: u64,
}

/// Stat the file for the (size, mtime, inode) triple the cache keys on.
pub fn observe_file(path: &Path) -> ChronicleResult<FileObservation> {
    let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ChronicleError::NotFound {
            what: format!("file {}", path.display()),
        },
        std::io::ErrorKind::PermissionDenied => ChronicleError::AccessDenied {
            path: path.display().to_string(),
        },
        _ => ChronicleError::Io {
            context: format!("stat-ing {}", path.display()),
            source: e,
        },
    })?;

    let mtime_nanos = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    #[cfg(unix)]
    let inode = {
        use std::os::unix::fs::MetadataExt;
        meta.ino()
    };
    #[cfg(not(unix))]
    let inode = 0u64;

    Ok(FileObservation {
        size_bytes: meta.len(),
        mtime_nanos,
        inode,
    })
}

/// An entry-count estimate plus the cache entry that should replace the old
/// one (absent when the cache was still valid).
#[derive(Debug, Clone)]
pub struct Estimate {
    pub estimated_entries: u64,
    pub bytes_per_line: f64,
    /// Present when the cache was stale and a refreshed entry should be
    /// written back.
    pub refreshed_stats: Option<CachedStats>,
}

/// Estimate the entry count of `path`, consulting and refreshing the cache.
pub fn estimate_entries(
    path: &Path,
    cached: Option<&CachedStats>,
    config: &ChronicleConfig,
) -> ChronicleResult<Estimate> {
    let observed = observe_file(path)?;

    if observed.size_bytes == 0 {
        return Ok(Estimate {
            estimated_entries: 0,
            bytes_per_line: 0.0,
            refreshed_stats: None,
        });
    }

    // Cache hit: the file is byte-identical to what was last observed.
    if let Some(stats) = cached {
        if stats.matches(observed.size_bytes, observed.mtime_nanos, observed.inode) {
            let estimated = if stats.line_count >= 0 {
                // An unchanged file keeps its precise count.
                stats.line_count as u64
            } else {
                derive_count(observed.size_bytes, stats.ema_bytes_per_line)
            };
            return Ok(Estimate {
                estimated_entries: estimated,
                bytes_per_line: stats.ema_bytes_per_line,
                refreshed_stats: None,
            });
        }
        debug!(
            path = %path.display(),
            cached_size = stats.size_bytes,
            observed_size = observed.size_bytes,
            "cached stats stale, resampling"
        );
    }

    // Stale or absent: sample the tail for a fresh bytes-per-line figure.
    let tail = fsio::read_tail(path, config.tail_sample_bytes)?;
    let sample_lines = tail.iter().filter(|&&b| b == b'\n').count() as u64;

    let raw_bpl = if sample_lines > 0 {
        tail.len() as f64 / sample_lines as f64
    } else {
        // One giant unterminated line; assume the widest plausible records.
        config.max_bytes_per_line
    };
    let sampled_bpl = config.clamp_bytes_per_line(raw_bpl);

    let ema = match cached {
        Some(stats) if stats.initialized && stats.ema_bytes_per_line > 0.0 => {
            config.ema_weight * sampled_bpl + (1.0 - config.ema_weight) * stats.ema_bytes_per_line
        }
        _ => sampled_bpl,
    };
    let ema = config.clamp_bytes_per_line(ema);

    let estimated = derive_count(observed.size_bytes, ema);

    let refreshed = CachedStats {
        size_bytes: observed.size_bytes,
        line_count: -1,
        ema_bytes_per_line: ema,
        mtime_nanos: observed.mtime_nanos,
        inode: observed.inode,
        initialized: true,
        source: StatsSource::TailSample,
        updated_at: Utc::now(),
    };

    Ok(Estimate {
        estimated_entries: estimated,
        bytes_per_line: ema,
        refreshed_stats: Some(refreshed),
    })
}

fn derive_count(size_bytes: u64, bytes_per_line: f64) -> u64 {
    if bytes_per_line <= 0.0 {
        return 0;
    }
    (size_bytes as f64 / bytes_per_line).round() as u64
}

// ── Tests ─────────────────────────────────────────────────────────────────────
