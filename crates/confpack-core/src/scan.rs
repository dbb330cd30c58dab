//! Change detection across directory trees and packages
//!
//! Compares a base tree (usually `default/`) against a current tree
//! (usually `local/`) and reports added, removed, and modified conf
//! files with per-stanza detail where both sides are text.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use confpack_format::diff::{diff_sources, StanzaChange};
use confpack_format::ChangeKind;
use confpack_fs::{conf_files, files_identical, is_binary, read_to_string, PackageLayout};

use crate::error::Result;

/// One changed file between two trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the tree roots
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// Per-stanza detail; empty for added/removed files and for
    /// binary modifications.
    pub stanza_changes: Vec<StanzaChange>,
}

impl FileChange {
    pub fn is_new(&self) -> bool {
        self.kind == ChangeKind::Added
    }
}

/// Result of scanning one package for changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub root: PathBuf,
    pub file_changes: Vec<FileChange>,
    pub is_valid: bool,
    /// Set when the scan could not run at all
    pub error: Option<String>,
}

impl ScanResult {
    pub fn has_changes(&self) -> bool {
        !self.file_changes.is_empty()
    }

    fn invalid(root: &Path, message: String) -> Self {
        Self {
            root: root.to_path_buf(),
            file_changes: Vec::new(),
            is_valid: false,
            error: Some(message),
        }
    }
}

/// Stanza-level changes between two conf files.
pub fn diff_files(base: &Path, current: &Path) -> Result<Vec<StanzaChange>> {
    let base_text = read_to_string(base)?;
    let current_text = read_to_string(current)?;
    Ok(diff_sources(&base_text, &current_text))
}

/// Compare two directory trees of conf files.
///
/// Files only in `current` are reported added, files only in `base`
/// removed. For files in both, binary content falls back to a byte
/// comparison with no stanza detail; text content gets a stanza-level
/// diff. An absent `current` tree reports every base file as added,
/// which covers packages whose overrides have not been split out yet.
pub fn diff_trees(base: &Path, current: Option<&Path>) -> Result<Vec<FileChange>> {
    let base_files = conf_files(base)?;
    let mut changes = Vec::new();

    let Some(current) = current else {
        for path in base_files {
            changes.push(FileChange {
                path,
                kind: ChangeKind::Added,
                stanza_changes: Vec::new(),
            });
        }
        return Ok(changes);
    };

    let current_files = conf_files(current)?;

    for path in current_files.difference(&base_files) {
        changes.push(FileChange {
            path: path.clone(),
            kind: ChangeKind::Added,
            stanza_changes: Vec::new(),
        });
    }
    for path in base_files.difference(&current_files) {
        changes.push(FileChange {
            path: path.clone(),
            kind: ChangeKind::Removed,
            stanza_changes: Vec::new(),
        });
    }

    for path in base_files.intersection(&current_files) {
        let base_file = base.join(path);
        let current_file = current.join(path);

        if is_binary(&base_file)? || is_binary(&current_file)? {
            if !files_identical(&base_file, &current_file)? {
                debug!(path = %path.display(), "binary content differs");
                changes.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Modified,
                    stanza_changes: Vec::new(),
                });
            }
            continue;
        }

        let stanza_changes = diff_files(&base_file, &current_file)?;
        if !stanza_changes.is_empty() {
            changes.push(FileChange {
                path: path.clone(),
                kind: ChangeKind::Modified,
                stanza_changes,
            });
        }
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(changes)
}

/// Scan a package for changes.
///
/// With a baseline directory, the package is compared against it as a
/// whole. Without one, the package's `local/` overrides are compared
/// against its `default/` tree; a package with no `local/` reports no
/// changes. Layout problems are reported on the result rather than as
/// an error, so batch callers can keep scanning siblings.
pub fn scan_package(root: &Path, baseline: Option<&Path>) -> Result<ScanResult> {
    let layout = match PackageLayout::resolve(root) {
        Ok(layout) => layout,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "not a scannable package");
            return Ok(ScanResult::invalid(root, e.to_string()));
        }
    };

    let file_changes = match baseline {
        Some(baseline) => diff_trees(baseline, Some(root))?,
        None => match &layout.local_dir {
            Some(local_dir) => diff_trees(&layout.default_dir, Some(local_dir))?,
            None => Vec::new(),
        },
    };

    Ok(ScanResult {
        root: root.to_path_buf(),
        file_changes,
        is_valid: true,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn absent_current_tree_reports_everything_added() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.conf"), "[install]\n").unwrap();
        fs::write(dir.path().join("props.conf"), "[source::x]\n").unwrap();

        let changes = diff_trees(dir.path(), None).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(FileChange::is_new));
    }

    #[test]
    fn classifies_added_removed_and_modified_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        let current = dir.path().join("current");
        fs::create_dir_all(&base).unwrap();
        fs::create_dir_all(&current).unwrap();

        fs::write(base.join("gone.conf"), "[a]\n").unwrap();
        fs::write(base.join("same.conf"), "[a]\nx = 1\n").unwrap();
        fs::write(base.join("edited.conf"), "[a]\nx = 1\n").unwrap();
        fs::write(current.join("same.conf"), "[a]\nx = 1\n").unwrap();
        fs::write(current.join("edited.conf"), "[a]\nx = 2\n").unwrap();
        fs::write(current.join("fresh.conf"), "[b]\n").unwrap();

        let changes = diff_trees(&base, Some(&current)).unwrap();
        let kinds: Vec<(&str, ChangeKind)> = changes
            .iter()
            .map(|c| (c.path.to_str().unwrap(), c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("edited.conf", ChangeKind::Modified),
                ("fresh.conf", ChangeKind::Added),
                ("gone.conf", ChangeKind::Removed),
            ]
        );

        let edited = &changes[0];
        assert_eq!(edited.stanza_changes.len(), 1);
        assert_eq!(edited.stanza_changes[0].name, "a");
    }

    #[test]
    fn binary_files_compare_bytewise_without_stanza_detail() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        let current = dir.path().join("current");
        fs::create_dir_all(&base).unwrap();
        fs::create_dir_all(&current).unwrap();

        fs::write(base.join("blob.conf"), [0x00, 0x01, 0x02]).unwrap();
        fs::write(current.join("blob.conf"), [0x00, 0x01, 0x03]).unwrap();

        let changes = diff_trees(&base, Some(&current)).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        assert!(changes[0].stanza_changes.is_empty());
    }

    #[test]
    fn scan_compares_local_against_default() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("ta_test");
        fs::create_dir_all(package.join("default")).unwrap();
        fs::create_dir_all(package.join("local")).unwrap();
        fs::write(package.join("default/props.conf"), "[a]\nx = 1\n").unwrap();
        fs::write(package.join("local/props.conf"), "[a]\nx = 2\n").unwrap();

        let result = scan_package(&package, None).unwrap();
        assert!(result.is_valid);
        assert!(result.has_changes());
        assert_eq!(result.file_changes[0].path, PathBuf::from("props.conf"));
    }

    #[test]
    fn scan_result_serializes_for_reporting() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("ta_json");
        fs::create_dir_all(package.join("default")).unwrap();
        fs::create_dir_all(package.join("local")).unwrap();
        fs::write(package.join("local/new.conf"), "[a]\nx = 1\n").unwrap();

        let result = scan_package(&package, None).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["is_valid"], true);
        assert_eq!(json["file_changes"][0]["kind"], "Added");
    }

    #[test]
    fn scan_of_invalid_package_reports_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_package = dir.path().join("plain");
        fs::create_dir_all(&not_a_package).unwrap();

        let result = scan_package(&not_a_package, None).unwrap();
        assert!(!result.is_valid);
        assert!(result.error.is_some());
        assert!(!result.has_changes());
    }
}
