//! Package version management
//!
//! A package's version lives in the `version` setting of the
//! `[launcher]` stanza in `default/app.conf`. Reads and updates go
//! through the format engine, so comments and layout around the
//! setting survive a version bump.

use std::path::{Path, PathBuf};

use tracing::info;

use confpack_format::{classify, parse, write, Setting, Stanza};
use confpack_fs::{find_packages, read_to_string, write_text};

use crate::error::{Error, Result};

const LAUNCHER_STANZA: &str = "launcher";
const VERSION_KEY: &str = "version";

fn app_conf_path(package_root: &Path) -> PathBuf {
    package_root.join("default").join("app.conf")
}

/// Read a package's version from `default/app.conf`.
///
/// Returns `None` when the file, the `[launcher]` stanza, or the
/// `version` setting is absent.
pub fn read_version(package_root: &Path) -> Result<Option<String>> {
    let app_conf = app_conf_path(package_root);
    if !app_conf.is_file() {
        return Ok(None);
    }

    let parsed = parse(&read_to_string(&app_conf)?)?;
    Ok(parsed
        .stanza(LAUNCHER_STANZA)
        .and_then(|s| s.get(VERSION_KEY))
        .map(|setting| setting.value.logical().to_string()))
}

/// Set a package's version in `default/app.conf`, rewriting the file
/// atomically.
///
/// The setting is replaced in place when present; a missing
/// `[launcher]` stanza (or `version` key) is created. A package
/// without `default/app.conf` is rejected.
pub fn update_version(package_root: &Path, new_version: &str) -> Result<()> {
    let app_conf = app_conf_path(package_root);
    if !app_conf.is_file() {
        return Err(Error::InvalidPackage {
            path: package_root.to_path_buf(),
        });
    }

    let mut parsed = parse(&read_to_string(&app_conf)?)?;
    match parsed.stanza_mut(LAUNCHER_STANZA) {
        Some(stanza) => stanza.upsert(Setting::single(VERSION_KEY, new_version)),
        None => {
            let mut stanza = Stanza::new(LAUNCHER_STANZA, classify(LAUNCHER_STANZA), 0);
            stanza.upsert(Setting::single(VERSION_KEY, new_version));
            parsed.push_stanza(stanza);
        }
    }

    write_text(&app_conf, &write(&parsed))?;
    info!(package = %package_root.display(), version = new_version, "updated package version");
    Ok(())
}

/// Set the version across every package under a base directory.
/// Returns the package roots that were updated.
pub fn update_versions(base: &Path, new_version: &str) -> Result<Vec<PathBuf>> {
    let mut updated = Vec::new();
    for package in find_packages(base, false)? {
        update_version(&package, new_version)?;
        updated.push(package);
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    const APP_CONF: &str = "\
# packaging metadata
[launcher]
author = ops team
version = 1.0.0

[package]
id = ta_web
";

    fn make_package(root: &Path, name: &str, app_conf: &str) -> PathBuf {
        let package = root.join(name);
        fs::create_dir_all(package.join("default")).unwrap();
        fs::write(package.join("default/app.conf"), app_conf).unwrap();
        package
    }

    #[test]
    fn reads_launcher_version() {
        let dir = tempfile::tempdir().unwrap();
        let package = make_package(dir.path(), "ta_web", APP_CONF);

        assert_eq!(read_version(&package).unwrap().as_deref(), Some("1.0.0"));
    }

    #[test]
    fn missing_app_conf_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_version(dir.path()).unwrap(), None);
    }

    #[test]
    fn update_replaces_version_and_keeps_surroundings() {
        let dir = tempfile::tempdir().unwrap();
        let package = make_package(dir.path(), "ta_web", APP_CONF);

        update_version(&package, "2.0.0").unwrap();

        assert_eq!(read_version(&package).unwrap().as_deref(), Some("2.0.0"));
        let text = fs::read_to_string(package.join("default/app.conf")).unwrap();
        assert!(text.contains("# packaging metadata"));
        assert!(text.contains("author = ops team"));
        assert!(text.contains("id = ta_web"));
        assert!(!text.contains("1.0.0"));
    }

    #[test]
    fn update_creates_missing_launcher_stanza() {
        let dir = tempfile::tempdir().unwrap();
        let package = make_package(dir.path(), "ta_bare", "[package]\nid = ta_bare\n");

        update_version(&package, "0.1.0").unwrap();
        assert_eq!(read_version(&package).unwrap().as_deref(), Some("0.1.0"));
    }

    #[test]
    fn update_without_app_conf_is_an_invalid_package() {
        let dir = tempfile::tempdir().unwrap();
        let err = update_version(dir.path(), "2.0.0").unwrap_err();
        assert!(matches!(err, Error::InvalidPackage { .. }));
    }

    #[test]
    fn bulk_update_covers_every_package() {
        let dir = tempfile::tempdir().unwrap();
        let one = make_package(dir.path(), "ta_one", APP_CONF);
        let two = make_package(dir.path(), "ta_two", APP_CONF);
        fs::create_dir_all(dir.path().join("not_a_package")).unwrap();

        let updated = update_versions(dir.path(), "3.1.4").unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(read_version(&one).unwrap().as_deref(), Some("3.1.4"));
        assert_eq!(read_version(&two).unwrap().as_deref(), Some("3.1.4"));
    }
}
