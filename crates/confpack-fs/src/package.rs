//! Package (TA) directory layout contract
//!
//! A package root ships a required `default/` subtree and optional
//! `local/` and `metadata/` subtrees. The format engine never does
//! discovery itself; callers resolve paths through this module and
//! hand them down.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

/// Resolved directory layout of one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    pub root: PathBuf,
    pub default_dir: PathBuf,
    /// Present only when the package carries user overrides
    pub local_dir: Option<PathBuf>,
    pub metadata_dir: Option<PathBuf>,
}

impl PackageLayout {
    /// Resolve the layout of a package root, requiring `default/`.
    pub fn resolve(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        let default_dir = root.join("default");
        if !default_dir.is_dir() {
            return Err(Error::MissingDefault {
                path: root.to_path_buf(),
            });
        }

        let local_dir = Some(root.join("local")).filter(|p| p.is_dir());
        let metadata_dir = Some(root.join("metadata")).filter(|p| p.is_dir());

        Ok(Self {
            root: root.to_path_buf(),
            default_dir,
            local_dir,
            metadata_dir,
        })
    }

    /// Path of the local metadata file, when the package has one.
    pub fn local_meta(&self) -> Option<PathBuf> {
        self.metadata_dir
            .as_ref()
            .map(|dir| dir.join("local.meta"))
            .filter(|p| p.is_file())
    }

    /// Target path for merged metadata.
    pub fn default_meta(&self) -> Option<PathBuf> {
        self.metadata_dir.as_ref().map(|dir| dir.join("default.meta"))
    }
}

/// Whether a directory looks like a valid package: a `default/`
/// subtree holding `app.conf` or at least one `*.conf` file.
pub fn is_valid_package(path: &Path) -> bool {
    let default_dir = path.join("default");
    if !default_dir.is_dir() {
        return false;
    }
    if default_dir.join("app.conf").is_file() {
        return true;
    }
    fs::read_dir(&default_dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                e.path().is_file() && e.path().extension().is_some_and(|ext| ext == "conf")
            })
        })
        .unwrap_or(false)
}

/// Find package roots under a base directory.
///
/// A base that is itself a package is returned directly. Otherwise
/// direct children are checked, and with `recursive` the search
/// descends into non-package subdirectories. Inaccessible directories
/// are skipped.
pub fn find_packages(base: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !base.exists() {
        return Err(Error::io(
            base,
            std::io::Error::new(std::io::ErrorKind::NotFound, "path does not exist"),
        ));
    }
    if !base.is_dir() {
        return Err(Error::NotADirectory {
            path: base.to_path_buf(),
        });
    }

    if is_valid_package(base) {
        return Ok(vec![base.to_path_buf()]);
    }

    let mut packages = Vec::new();
    let Ok(entries) = fs::read_dir(base) else {
        debug!(path = %base.display(), "skipping unreadable directory");
        return Ok(packages);
    };

    let mut children: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    children.sort();

    for child in &children {
        if is_valid_package(child) {
            packages.push(child.clone());
        } else if recursive {
            if let Ok(mut nested) = find_packages(child, true) {
                packages.append(&mut nested);
            }
        }
    }

    Ok(packages)
}
