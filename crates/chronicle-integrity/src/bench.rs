//! Hashing throughput measurement for capacity planning.
//!
//! Not on the rotation hot path — operators run this against a
//! representative log to size rotation thresholds.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use chronicle_contracts::error::ChronicleResult;

use crate::hasher::compute_file_hash;

/// Result of one throughput measurement.
#[derive(Debug, Clone, Serialize)]
pub struct HashThroughput {
    pub bytes_hashed: u64,
    pub elapsed_seconds: f64,
    pub megabytes_per_second: f64,
}

/// Hash `path` once and report the observed throughput.
pub fn benchmark_throughput(path: &Path) -> ChronicleResult<HashThroughput> {
    let start = Instant::now();
    let digest = compute_file_hash(path)?;
    let elapsed = start.elapsed().as_secs_f64();

    let megabytes = digest.size_bytes as f64 / (1024.0 * 1024.0);
    let megabytes_per_second = if elapsed > 0.0 { megabytes / elapsed } else { 0.0 };

    Ok(HashThroughput {
        bytes_hashed: digest.size_bytes,
        elapsed_seconds: elapsed,
        megabytes_per_second,
    })
}
