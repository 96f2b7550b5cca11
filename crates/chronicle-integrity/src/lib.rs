//! # chronicle-integrity
//!
//! Streaming SHA-256 hashing, verification, line counting, and the atomic
//! filesystem primitives every CHRONICLE persistence crate builds on.
//!
//! ## Overview
//!
//! Hashing reads in fixed 4 KiB chunks — memory use is independent of file
//! size. `verify` treats a hash mismatch as a normal result, not an error;
//! only unreadable files raise. `fsio` holds the temp-file-then-rename
//! replace and the copy-then-truncate archive seal, the two moves that make
//! rotation crash-safe.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chronicle_integrity::{compute_file_hash, verify};
//!
//! let digest = compute_file_hash(&path)?;
//! let (valid, actual) = verify(&path, &digest.hash)?;
//! assert!(valid);
//! ```

pub mod bench;
pub mod fsio;
pub mod hasher;

pub use bench::{benchmark_throughput, HashThroughput};
pub use hasher::{build_file_metadata, compute_file_hash, count_lines, verify, HASH_CHUNK_BYTES};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use chronicle_contracts::error::ChronicleError;

    use super::fsio;
    use super::{build_file_metadata, compute_file_hash, count_lines, verify};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    // ── Hashing ───────────────────────────────────────────────────────────────

    /// verify(f, compute_file_hash(f).hash) holds for any file.
    #[test]
    fn test_hash_then_verify_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.log", b"entry one\nentry two\n");

        let digest = compute_file_hash(&path).unwrap();
        assert_eq!(digest.hash.len(), 64);
        assert_eq!(digest.size_bytes, 20);

        let (valid, actual) = verify(&path, &digest.hash).unwrap();
        assert!(valid);
        assert_eq!(actual, digest.hash);
    }

    /// Chunked hashing matches the known digest regardless of how content
    /// aligns with the 4 KiB chunk boundary.
    #[test]
    fn test_hash_chunk_boundaries() {
        let dir = TempDir::new().unwrap();

        for size in [0usize, 1, 4095, 4096, 4097, 3 * 4096 + 17] {
            let content = vec![b'x'; size];
            let path = write_file(&dir, &format!("f{}.log", size), &content);

            let digest = compute_file_hash(&path).unwrap();
            assert_eq!(digest.size_bytes, size as u64);

            // Same content hashed in one shot must agree with the streamed hash.
            use sha2::{Digest, Sha256};
            let expected = hex::encode(Sha256::digest(&content));
            assert_eq!(digest.hash, expected, "size {}", size);
        }
    }

    /// The empty file hashes to the well-known SHA-256 of zero bytes.
    #[test]
    fn test_empty_file_hash() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.log", b"");

        let digest = compute_file_hash(&path).unwrap();
        assert_eq!(
            digest.hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    /// A mismatch returns (false, actual) — it never raises.
    #[test]
    fn test_verify_mismatch_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.log", b"content\n");

        let bogus = "0".repeat(64);
        let (valid, actual) = verify(&path, &bogus).unwrap();
        assert!(!valid);
        assert_ne!(actual, bogus);
    }

    /// Hashing a missing path fails with `NotFound`.
    #[test]
    fn test_hash_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = compute_file_hash(&dir.path().join("absent.log")).unwrap_err();
        match err {
            ChronicleError::NotFound { what } => assert!(what.contains("absent.log")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    // ── Line counting ─────────────────────────────────────────────────────────

    /// Only newline-terminated records count; a trailing partial line does not.
    #[test]
    fn test_count_lines_newline_terminated() {
        let dir = TempDir::new().unwrap();

        let complete = write_file(&dir, "complete.log", b"a\nb\nc\n");
        assert_eq!(count_lines(&complete).unwrap(), 3);

        let partial = write_file(&dir, "partial.log", b"a\nb\nc");
        assert_eq!(count_lines(&partial).unwrap(), 2);

        let empty = write_file(&dir, "empty.log", b"");
        assert_eq!(count_lines(&empty).unwrap(), 0);
    }

    // ── Metadata ──────────────────────────────────────────────────────────────

    /// Metadata merges digest, size, timestamps, access flags, and extras.
    #[test]
    fn test_build_file_metadata() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.log", b"one\ntwo\n");

        let mut extra = BTreeMap::new();
        extra.insert("origin".to_string(), serde_json::json!("test"));

        let meta = build_file_metadata(&path, extra).unwrap();
        assert_eq!(meta.size_bytes, 8);
        assert_eq!(meta.hash, compute_file_hash(&path).unwrap().hash);
        assert!(meta.modified_secs > 0);
        assert!(meta.readable);
        assert!(meta.writable);
        assert_eq!(meta.extra["origin"], "test");
    }

    // ── Atomic replace ────────────────────────────────────────────────────────

    /// Replacement swaps content and leaves no temp file behind.
    #[test]
    fn test_atomic_replace() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "doc.json", b"old");

        fsio::atomic_replace(&path, b"new content").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new content");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
    }

    /// Replace also works when the target does not exist yet.
    #[test]
    fn test_atomic_replace_creates_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        fsio::atomic_replace(&path, b"fresh").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"fresh");
    }

    // ── Archive seal ──────────────────────────────────────────────────────────

    /// Sealing copies the content to the archive and empties the live log
    /// without deleting it.
    #[test]
    fn test_archive_live_log_copy_then_truncate() {
        let dir = TempDir::new().unwrap();
        let live = write_file(&dir, "progress.log", b"e1\ne2\ne3\n");
        let archive = dir.path().join("archive").join("progress-0001.log");

        let bytes = fsio::archive_live_log(&live, &archive).unwrap();
        assert_eq!(bytes, 9);
        assert_eq!(fs::read(&archive).unwrap(), b"e1\ne2\ne3\n");

        // The live file still exists, but holds nothing.
        assert!(live.exists());
        assert_eq!(fs::metadata(&live).unwrap().len(), 0);
    }

    // ── Tail reads ────────────────────────────────────────────────────────────

    /// Tail reads cap at max_bytes and return whole files when smaller.
    #[test]
    fn test_read_tail() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.log", b"0123456789");

        assert_eq!(fsio::read_tail(&path, 4).unwrap(), b"6789");
        assert_eq!(fsio::read_tail(&path, 100).unwrap(), b"0123456789");
    }

    // ── Throughput helper ─────────────────────────────────────────────────────

    /// The benchmark reports the hashed byte count and a finite rate.
    #[test]
    fn test_benchmark_throughput() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "big.log", &vec![b'z'; 64 * 1024]);

        let report = super::benchmark_throughput(&path).unwrap();
        assert_eq!(report.bytes_hashed, 64 * 1024);
        assert!(report.megabytes_per_second.is_finite());
    }
}
