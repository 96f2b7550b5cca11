//! Filesystem layout shared by the append path and the rotation pipeline.
//!
//! One directory per project under a single root, one live log per log type,
//! archives under `archive/`, and the write-ahead journal colocated with the
//! log it protects. Path construction lives here so every crate derives the
//! same names from the same inputs.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/
//!   <project-slug>/
//!     progress.log
//!     progress.log.journal
//!     archive/
//!       progress-0001.log
//!       progress-0002-premerge.log
//! ```

use std::path::{Path, PathBuf};

/// Filesystem-safe slug of a project name: every non-alphanumeric character
/// becomes `_`.
pub fn project_slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Whether a log-type string is safe to embed in a file name.
///
/// ASCII alphanumerics plus `-` and `_`, non-empty.
pub fn is_safe_log_type(log_type: &str) -> bool {
    !log_type.is_empty()
        && log_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Path arithmetic over one state root directory.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project_slug(project))
    }

    /// A project is configured once its directory exists (the appender
    /// creates it on first append).
    pub fn is_configured(&self, project: &str) -> bool {
        self.project_dir(project).is_dir()
    }

    pub fn live_log(&self, project: &str, log_type: &str) -> PathBuf {
        self.project_dir(project).join(format!("{}.log", log_type))
    }

    pub fn archive_dir(&self, project: &str) -> PathBuf {
        self.project_dir(project).join("archive")
    }

    /// The archive file name the rotation with `sequence` will produce.
    ///
    /// Deterministic in (log_type, sequence, suffix) so dry runs preview the
    /// exact path a real rotation creates.
    pub fn archive_file_name(log_type: &str, sequence: u64, suffix: Option<&str>) -> String {
        match suffix {
            Some(s) => format!("{}-{:04}-{}.log", log_type, sequence, s),
            None => format!("{}-{:04}.log", log_type, sequence),
        }
    }

    pub fn archive_path(
        &self,
        project: &str,
        log_type: &str,
        sequence: u64,
        suffix: Option<&str>,
    ) -> PathBuf {
        self.archive_dir(project)
            .join(Self::archive_file_name(log_type, sequence, suffix))
    }

    /// The write-ahead journal colocated with a live log.
    pub fn journal_path(live_log: &Path) -> PathBuf {
        let mut name = live_log
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(".journal");
        live_log.with_file_name(name)
    }
}
