//! File digest and metadata types produced by the integrity hasher.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The SHA-256 content digest of one file.
///
/// Immutable once computed. `hash` is a lowercase 64-character hex string;
/// `size_bytes` is the file size observed while streaming the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    /// Lowercase hex SHA-256 of the file content.
    pub hash: String,
    /// Total bytes hashed.
    pub size_bytes: u64,
}

/// Digest plus POSIX-style file facts, as returned by `build_file_metadata`.
///
/// `extra` carries caller-supplied key/value pairs merged verbatim; the core
/// never interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Absolute or caller-relative path the metadata describes.
    pub path: String,
    pub hash: String,
    pub size_bytes: u64,
    /// Seconds since the Unix epoch of the last modification.
    pub modified_secs: i64,
    /// Seconds since the Unix epoch of the last access, if the platform
    /// reports one.
    pub accessed_secs: Option<i64>,
    pub readable: bool,
    pub writable: bool,
    /// Opaque caller-supplied annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}
