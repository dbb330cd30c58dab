//! Write-safety guard and user-facing backups

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

use crate::{Error, Result};

/// Scoped copy-aside guard around an overwrite.
///
/// Copies the target aside on creation. Dropping the guard without
/// calling [`WriteGuard::commit`] restores the copy, so any failure
/// path between acquisition and commit puts the original content
/// back. Commit deletes the copy.
#[derive(Debug)]
pub struct WriteGuard {
    target: PathBuf,
    backup: Option<PathBuf>,
    committed: bool,
}

impl WriteGuard {
    /// Guard `target` for overwriting. A missing target needs no copy;
    /// the guard is then a no-op.
    pub fn acquire(target: &Path) -> Result<Self> {
        let backup = if target.exists() {
            let backup = target.with_extension(match target.extension() {
                Some(ext) => format!("{}.bak", ext.to_string_lossy()),
                None => "bak".to_string(),
            });
            fs::copy(target, &backup).map_err(|e| Error::io(target, e))?;
            Some(backup)
        } else {
            None
        };

        Ok(Self {
            target: target.to_path_buf(),
            backup,
            committed: false,
        })
    }

    /// The write succeeded: discard the copy.
    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        if let Some(backup) = self.backup.take() {
            fs::remove_file(&backup).map_err(|e| Error::io(&backup, e))?;
        }
        Ok(())
    }

    /// Restore the copied-aside content. Used by drop; exposed so
    /// callers can handle a restore failure explicitly.
    pub fn restore(&mut self) -> Result<()> {
        if let Some(backup) = self.backup.take() {
            fs::copy(&backup, &self.target).map_err(|e| Error::io(&self.target, e))?;
            fs::remove_file(&backup).map_err(|e| Error::io(&backup, e))?;
        }
        Ok(())
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = self.restore() {
                warn!(target = %self.target.display(), error = %e, "failed to restore backup");
            }
        }
    }
}

/// Create a timestamped backup next to a file or directory, for the
/// user-facing backup feature. Returns the backup path.
pub fn create_backup(path: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let backup_path = path.with_file_name(format!("{file_name}.{timestamp}.bak"));

    if path.is_dir() {
        copy_dir(path, &backup_path)?;
    } else {
        fs::copy(path, &backup_path).map_err(|e| Error::io(path, e))?;
    }
    Ok(backup_path)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| Error::io(dst, e))?;
    for entry in fs::read_dir(src).map_err(|e| Error::io(src, e))? {
        let entry = entry.map_err(|e| Error::io(src, e))?;
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::io(entry.path(), e))?;
        }
    }
    Ok(())
}
