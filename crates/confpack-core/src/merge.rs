//! Package-level merge orchestration
//!
//! Walks a package's `local/` overrides (plus `metadata/local.meta`),
//! merges each file against its `default/` counterpart with the
//! format engine, and writes the results back under a scoped
//! write-safety guard. Failures are isolated per file: one bad file
//! never aborts the batch.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use confpack_format::merge::{merge, MergeMode, MergeReport};
use confpack_format::{parse, write, ParsedFile};
use confpack_fs::{local_conf_files, read_to_string, write_text, PackageLayout, WriteGuard};

use crate::error::Result;

/// Outcome for one local file in the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMergeResult {
    /// The local source file
    pub path: PathBuf,
    /// The default-side target it merges into
    pub target: PathBuf,
    pub report: Option<MergeReport>,
    /// Set when this file failed; siblings are unaffected
    pub error: Option<String>,
}

impl FileMergeResult {
    fn failed(path: PathBuf, target: PathBuf, error: String) -> Self {
        Self {
            path,
            target,
            report: None,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none() && self.report.as_ref().is_none_or(MergeReport::success)
    }
}

/// Aggregate outcome of a package merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub files: Vec<FileMergeResult>,
    /// Set when the batch itself could not run
    pub error: Option<String>,
}

impl MergeOutcome {
    pub fn success(&self) -> bool {
        self.error.is_none() && self.files.iter().all(FileMergeResult::success)
    }

    pub fn file(&self, path: &Path) -> Option<&FileMergeResult> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Merges a package's local overrides into its defaults.
pub struct PackageMerger {
    layout: PackageLayout,
    mode: MergeMode,
    outcome: MergeOutcome,
    /// Merged models awaiting write, keyed by local source path
    pending: HashMap<PathBuf, ParsedFile>,
}

impl PackageMerger {
    pub fn new(package_root: &Path, mode: MergeMode) -> Result<Self> {
        let layout = PackageLayout::resolve(package_root)?;
        Ok(Self {
            layout,
            mode,
            outcome: MergeOutcome::default(),
            pending: HashMap::new(),
        })
    }

    /// Merge every local conf file (and `local.meta`) against its
    /// default counterpart, producing per-file reports. Nothing is
    /// written yet.
    pub fn merge(&mut self) -> &MergeOutcome {
        self.outcome = MergeOutcome::default();
        self.pending.clear();

        let local_files = match local_conf_files(&self.layout.root) {
            Ok(files) => files,
            Err(_) => {
                debug!(package = %self.layout.root.display(), "no local directory, nothing to merge");
                Vec::new()
            }
        };

        for local_file in local_files {
            let target = local_file
                .file_name()
                .map(|name| self.layout.default_dir.join(name))
                .unwrap_or_else(|| self.layout.default_dir.clone());
            let result = self.merge_file(&local_file, &target);
            self.outcome.files.push(result);
        }

        if let Some(local_meta) = self.layout.local_meta() {
            if let Some(default_meta) = self.layout.default_meta() {
                let result = self.merge_file(&local_meta, &default_meta);
                self.outcome.files.push(result);
            }
        }

        info!(
            package = %self.layout.root.display(),
            files = self.outcome.files.len(),
            "merged package"
        );
        &self.outcome
    }

    fn merge_file(&mut self, local_path: &Path, target: &Path) -> FileMergeResult {
        debug!(local = %local_path.display(), target = %target.display(), "merging file");

        let local = match read_and_parse(local_path) {
            Ok(parsed) => parsed,
            Err(message) => {
                return FileMergeResult::failed(
                    local_path.to_path_buf(),
                    target.to_path_buf(),
                    format!("error parsing file: {message}"),
                );
            }
        };

        let default = if target.exists() {
            match read_and_parse(target) {
                Ok(parsed) => Some(parsed),
                Err(message) => {
                    return FileMergeResult::failed(
                        local_path.to_path_buf(),
                        target.to_path_buf(),
                        format!("error parsing default file: {message}"),
                    );
                }
            }
        } else {
            None
        };

        let (merged, report) = merge(local, default, self.mode);
        self.pending.insert(local_path.to_path_buf(), merged);

        FileMergeResult {
            path: local_path.to_path_buf(),
            target: target.to_path_buf(),
            report: Some(report),
            error: None,
        }
    }

    /// Write merged models to the default side.
    ///
    /// Each overwrite is wrapped in a [`WriteGuard`]: on a write
    /// failure the previous content is restored; if the restore also
    /// fails the local file is copied over the target verbatim. Write
    /// errors are recorded on the file result, and the batch
    /// continues.
    pub fn write(&mut self) -> &MergeOutcome {
        for result in &mut self.outcome.files {
            if !result.success() {
                continue;
            }

            // Target never existed: the merged model is the local file
            // verbatim, so a plain copy preserves it exactly.
            if !result.target.exists() {
                if let Err(e) = fs::copy(&result.path, &result.target) {
                    result.error = Some(format!("error writing file: {e}"));
                }
                continue;
            }

            let Some(model) = self.pending.get(&result.path) else {
                continue;
            };

            if let Err(message) = write_guarded(&result.path, &result.target, model) {
                result.error = Some(message);
            }
        }
        &self.outcome
    }

    /// Remove local files that merged successfully, pruning the
    /// `local/` directory when it ends up empty. Returns the removed
    /// paths.
    pub fn cleanup_local_files(&self) -> Vec<PathBuf> {
        let mut removed = Vec::new();

        for result in &self.outcome.files {
            if !result.success() || !result.path.exists() {
                continue;
            }
            match fs::remove_file(&result.path) {
                Ok(()) => removed.push(result.path.clone()),
                Err(e) => warn!(path = %result.path.display(), error = %e, "failed to remove merged local file"),
            }
        }

        if let Some(local_dir) = &self.layout.local_dir {
            let is_empty = fs::read_dir(local_dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if is_empty {
                match fs::remove_dir(local_dir) {
                    Ok(()) => info!(path = %local_dir.display(), "removed empty local directory"),
                    Err(e) => warn!(path = %local_dir.display(), error = %e, "failed to remove local directory"),
                }
            }
        }

        removed
    }

    pub fn outcome(&self) -> &MergeOutcome {
        &self.outcome
    }
}

fn read_and_parse(path: &Path) -> std::result::Result<ParsedFile, String> {
    let text = read_to_string(path).map_err(|e| e.to_string())?;
    parse(&text).map_err(|e| e.to_string())
}

/// Overwrite `target` with the serialized model under a write-safety
/// guard. On failure, restore the previous content; if even the
/// restore fails, fall back to copying the local file over the target
/// verbatim.
fn write_guarded(local_path: &Path, target: &Path, model: &ParsedFile) -> std::result::Result<(), String> {
    let mut guard = match WriteGuard::acquire(target) {
        Ok(guard) => guard,
        Err(e) => return Err(format!("error writing file: {e}")),
    };

    match write_text(target, &write(model)) {
        Ok(()) => {
            guard
                .commit()
                .map_err(|e| format!("error writing file: {e}"))
        }
        Err(write_err) => {
            if let Err(restore_err) = guard.restore() {
                warn!(
                    target = %target.display(),
                    error = %restore_err,
                    "restore failed, copying local file over target"
                );
                if let Err(copy_err) = fs::copy(local_path, target) {
                    return Err(format!(
                        "error writing file: {write_err}; fallback copy failed: {copy_err}"
                    ));
                }
            }
            Err(format!("error writing file: {write_err}"))
        }
    }
}
