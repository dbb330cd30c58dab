//! File-level sorting pipeline
//!
//! Ties the format engine's priority sort to the filesystem layer:
//! read, parse, sort, serialize, and write back atomically, with an
//! optional timestamped backup and a dry-run mode that reports what
//! would change without touching the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use confpack_format::{parse, sort, write, SortReport};
use confpack_fs::{create_backup, read_to_string, write_text};

use crate::error::Result;

/// Options for [`sort_file`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SortOptions {
    /// Report without writing
    pub dry_run: bool,
    /// Create a timestamped backup before overwriting
    pub backup: bool,
}

/// What sorting one file did (or would do, under dry-run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortFileResult {
    pub path: PathBuf,
    pub report: SortReport,
    /// Whether the sorted text differs from the input
    pub changed: bool,
    pub backup_path: Option<PathBuf>,
}

/// Sort conf text, returning the serialized result and the report.
pub fn sort_source(text: &str) -> Result<(String, SortReport)> {
    let parsed = parse(text)?;
    let (sorted, report) = sort(parsed);
    Ok((write(&sorted), report))
}

/// Sort one conf file in place.
///
/// Unchanged files are never rewritten, so repeated runs are
/// idempotent and timestamps stay put.
pub fn sort_file(path: &Path, options: SortOptions) -> Result<SortFileResult> {
    let text = read_to_string(path)?;
    let (sorted_text, report) = sort_source(&text)?;
    let changed = sorted_text != text;

    if !changed {
        debug!(path = %path.display(), "already sorted");
        return Ok(SortFileResult {
            path: path.to_path_buf(),
            report,
            changed,
            backup_path: None,
        });
    }

    if options.dry_run {
        info!(path = %path.display(), "would sort (dry run)");
        return Ok(SortFileResult {
            path: path.to_path_buf(),
            report,
            changed,
            backup_path: None,
        });
    }

    let backup_path = if options.backup {
        Some(create_backup(path)?)
    } else {
        None
    };

    write_text(path, &sorted_text)?;
    info!(
        path = %path.display(),
        stanzas_reordered = report.stanzas_reordered,
        settings_sorted = report.settings_sorted,
        "sorted file"
    );

    Ok(SortFileResult {
        path: path.to_path_buf(),
        report,
        changed,
        backup_path,
    })
}
