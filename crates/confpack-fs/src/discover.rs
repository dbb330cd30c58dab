//! Conf file discovery and file-level comparisons

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{Error, Result};

/// Bytes sniffed when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 4096;

/// Collect all `*.conf` files under a directory, recursively, as
/// paths relative to it.
pub fn conf_files(dir: &Path) -> Result<BTreeSet<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut files = BTreeSet::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(path, e.into())
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "conf")
        {
            if let Ok(relative) = entry.path().strip_prefix(dir) {
                files.insert(relative.to_path_buf());
            }
        }
    }
    Ok(files)
}

/// `*.conf` files directly under a package's `local/` directory.
pub fn local_conf_files(package_root: &Path) -> Result<Vec<PathBuf>> {
    let local_dir = package_root.join("local");
    if !local_dir.is_dir() {
        return Err(Error::NotADirectory { path: local_dir });
    }
    let mut files: Vec<PathBuf> = fs::read_dir(&local_dir)
        .map_err(|e| Error::io(&local_dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "conf"))
        .collect();
    files.sort();
    Ok(files)
}

/// Pair each local conf file with its default counterpart, `None`
/// when the default side does not exist yet.
pub fn match_conf_files(package_root: &Path) -> Result<BTreeMap<PathBuf, Option<PathBuf>>> {
    let mut pairs = BTreeMap::new();
    for local_file in local_conf_files(package_root)? {
        let default_file = local_file
            .file_name()
            .map(|name| package_root.join("default").join(name));
        let default_file = default_file.filter(|p| p.exists());
        pairs.insert(local_file, default_file);
    }
    Ok(pairs)
}

/// Binary heuristic: a NUL byte within the first 4KB.
pub fn is_binary(path: &Path) -> Result<bool> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut buffer = [0u8; BINARY_SNIFF_LEN];
    let read = file.read(&mut buffer).map_err(|e| Error::io(path, e))?;
    Ok(buffer[..read].contains(&0))
}

/// Byte-for-byte comparison, short-circuiting on size.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    let meta_a = fs::metadata(a).map_err(|e| Error::io(a, e))?;
    let meta_b = fs::metadata(b).map_err(|e| Error::io(b, e))?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut file_a = File::open(a).map_err(|e| Error::io(a, e))?;
    let mut file_b = File::open(b).map_err(|e| Error::io(b, e))?;
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    loop {
        let n_a = file_a.read(&mut buf_a).map_err(|e| Error::io(a, e))?;
        let n_b = file_b.read(&mut buf_b).map_err(|e| Error::io(b, e))?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}
