//! Atomic file primitives shared by the persistence crates.
//!
//! Temp-file-then-rename is the only cross-process safety mechanism in the
//! whole system — there is no distributed lock. The rename is retried
//! briefly because some platforms refuse to replace a file another reader
//! currently holds open.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use chronicle_contracts::error::{ChronicleError, ChronicleResult};

use crate::hasher::map_io_error;

const RENAME_RETRY_ATTEMPTS: u32 = 5;
const RENAME_RETRY_DELAY: Duration = Duration::from_millis(25);

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

/// Replace `path`'s content with `bytes` atomically.
///
/// Writes a temp file in the same directory, fsyncs it, then renames it over
/// the target. Readers observe either the old content or the new content,
/// never a partial write.
pub fn atomic_replace(path: &Path, bytes: &[u8]) -> ChronicleResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| map_io_error("creating directory", parent, e))?;
    }

    let tmp = temp_path_for(path);
    {
        let mut file = File::create(&tmp).map_err(|e| map_io_error("creating", &tmp, e))?;
        file.write_all(bytes)
            .map_err(|e| map_io_error("writing", &tmp, e))?;
        file.sync_all().map_err(|e| map_io_error("syncing", &tmp, e))?;
    }

    let mut attempt = 0;
    loop {
        match fs::rename(&tmp, path) {
            Ok(()) => return Ok(()),
            Err(e) if attempt + 1 < RENAME_RETRY_ATTEMPTS => {
                attempt += 1;
                debug!(
                    target_path = %path.display(),
                    attempt,
                    error = %e,
                    "rename refused, retrying"
                );
                std::thread::sleep(RENAME_RETRY_DELAY);
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(map_io_error("renaming over", path, e));
            }
        }
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn atomic_replace_json<T: Serialize>(path: &Path, value: &T) -> ChronicleResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| ChronicleError::StoreFailed {
        reason: format!("serializing {}: {}", path.display(), e),
    })?;
    bytes.push(b'\n');
    atomic_replace(path, &bytes)
}

/// Seal a live log: copy it to `archive`, fsync the copy, then truncate the
/// live file in place.
///
/// Copy-then-truncate keeps the live file's inode stable for any appender
/// holding it open. The live log is only truncated after the archive copy is
/// confirmed on disk, so a crash in between leaves the data duplicated, not
/// lost. Returns the bytes archived.
pub fn archive_live_log(live: &Path, archive: &Path) -> ChronicleResult<u64> {
    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent).map_err(|e| map_io_error("creating directory", parent, e))?;
    }

    let bytes = fs::copy(live, archive).map_err(|e| map_io_error("copying to archive", live, e))?;
    File::open(archive)
        .and_then(|f| f.sync_all())
        .map_err(|e| map_io_error("syncing", archive, e))?;

    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(live)
        .and_then(|f| f.sync_all())
        .map_err(|e| map_io_error("truncating", live, e))?;

    Ok(bytes)
}

/// Append one line (newline appended) to `path`, creating it if absent, and
/// flush it to disk before returning.
pub fn append_line(path: &Path, line: &str) -> ChronicleResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| map_io_error("opening for append", path, e))?;
    file.write_all(line.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .and_then(|_| file.sync_data())
        .map_err(|e| map_io_error("appending to", path, e))
}

/// Read at most the last `max_bytes` of `path`.
pub fn read_tail(path: &Path, max_bytes: u64) -> ChronicleResult<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| map_io_error("opening", path, e))?;
    let len = file
        .metadata()
        .map_err(|e| map_io_error("stat-ing", path, e))?
        .len();

    if len > max_bytes {
        file.seek(SeekFrom::Start(len - max_bytes))
            .map_err(|e| map_io_error("seeking in", path, e))?;
    }

    let mut tail = Vec::with_capacity(len.min(max_bytes) as usize);
    file.read_to_end(&mut tail)
        .map_err(|e| map_io_error("reading", path, e))?;
    Ok(tail)
}
