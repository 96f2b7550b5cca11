//! Streaming SHA-256 computation, verification, and file metadata.
//!
//! All hashing reads in fixed 4 KiB chunks, so memory use is independent of
//! file size. Error mapping is uniform across the crate: a missing path is
//! `NotFound`, a permission failure is `AccessDenied`, anything else is `Io`
//! with the failing operation named.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

use chronicle_contracts::digest::{FileDigest, FileMetadata};
use chronicle_contracts::error::{ChronicleError, ChronicleResult};

/// Fixed read-chunk size for all streaming file operations.
pub const HASH_CHUNK_BYTES: usize = 4096;

/// Map an `io::Error` to the crate taxonomy, naming the failed operation.
pub(crate) fn map_io_error(context: &str, path: &Path, source: std::io::Error) -> ChronicleError {
    match source.kind() {
        std::io::ErrorKind::NotFound => ChronicleError::NotFound {
            what: format!("file {}", path.display()),
        },
        std::io::ErrorKind::PermissionDenied => ChronicleError::AccessDenied {
            path: path.display().to_string(),
        },
        _ => ChronicleError::Io {
            context: format!("{} {}", context, path.display()),
            source,
        },
    }
}

/// Stream `path` through SHA-256 and return its digest.
pub fn compute_file_hash(path: &Path) -> ChronicleResult<FileDigest> {
    let mut file = File::open(path).map_err(|e| map_io_error("opening", path, e))?;

    let mut hasher = Sha256::new();
    let mut chunk = [0u8; HASH_CHUNK_BYTES];
    let mut size_bytes: u64 = 0;

    loop {
        let read = file
            .read(&mut chunk)
            .map_err(|e| map_io_error("reading", path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
        size_bytes += read as u64;
    }

    Ok(FileDigest {
        hash: hex::encode(hasher.finalize()),
        size_bytes,
    })
}

/// Recompute `path`'s hash and compare it to `expected`.
///
/// A mismatch is a normal result, not an error — only an unreadable file
/// raises. Returns `(valid, actual_hash)`.
pub fn verify(path: &Path, expected: &str) -> ChronicleResult<(bool, String)> {
    let digest = compute_file_hash(path)?;
    let valid = digest.hash.eq_ignore_ascii_case(expected);
    Ok((valid, digest.hash))
}

/// Count newline-terminated records in `path`.
///
/// A trailing partial line (bytes after the last newline) is not counted —
/// it is not yet a committed record.
pub fn count_lines(path: &Path) -> ChronicleResult<u64> {
    let mut file = File::open(path).map_err(|e| map_io_error("opening", path, e))?;

    let mut chunk = [0u8; HASH_CHUNK_BYTES];
    let mut lines: u64 = 0;

    loop {
        let read = file
            .read(&mut chunk)
            .map_err(|e| map_io_error("reading", path, e))?;
        if read == 0 {
            break;
        }
        lines += chunk[..read].iter().filter(|&&b| b == b'\n').count() as u64;
    }

    Ok(lines)
}

/// Build the full metadata map for `path`: digest, size, POSIX-style
/// timestamps, access flags, and the caller's `extra` annotations merged
/// verbatim.
pub fn build_file_metadata(
    path: &Path,
    extra: BTreeMap<String, serde_json::Value>,
) -> ChronicleResult<FileMetadata> {
    let digest = compute_file_hash(path)?;
    let meta = fs::metadata(path).map_err(|e| map_io_error("stat-ing", path, e))?;

    let modified_secs = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let accessed_secs = meta
        .accessed()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64);

    Ok(FileMetadata {
        path: path.display().to_string(),
        hash: digest.hash,
        size_bytes: digest.size_bytes,
        modified_secs,
        accessed_secs,
        // The digest above already proved the file readable.
        readable: true,
        writable: !meta.permissions().readonly(),
        extra,
    })
}
