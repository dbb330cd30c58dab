//! End-to-end test for the full package workflow
//!
//! Exercises the complete flow over a fixture package: scan for local
//! overrides, merge them into defaults, clean up, and sort the result.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use confpack_core::{scan_package, sort_file, PackageMerger, SortOptions};
use confpack_format::{parse, MergeMode};
use confpack_fs::is_valid_package;

fn fixture_package() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-fixtures/packages/ta_example")
}

/// Copy the fixture into a tempdir so the workflow can mutate it.
fn copy_fixture(dst: &Path) {
    fn copy_dir(src: &Path, dst: &Path) {
        fs::create_dir_all(dst).unwrap();
        for entry in fs::read_dir(src).unwrap() {
            let entry = entry.unwrap();
            let target = dst.join(entry.file_name());
            if entry.path().is_dir() {
                copy_dir(&entry.path(), &target);
            } else {
                fs::copy(entry.path(), &target).unwrap();
            }
        }
    }
    copy_dir(&fixture_package(), dst);
}

#[test]
fn test_fixture_is_a_valid_package() {
    assert!(is_valid_package(&fixture_package()));
}

#[test]
fn test_scan_then_merge_then_sort() {
    let temp = tempfile::tempdir().unwrap();
    let package = temp.path().join("ta_example");
    copy_fixture(&package);

    // Scan: the local props.conf overrides the default one.
    let scan = scan_package(&package, None).unwrap();
    assert!(scan.is_valid);
    assert!(scan.has_changes());
    let props = scan
        .file_changes
        .iter()
        .find(|c| c.path == PathBuf::from("props.conf"))
        .unwrap();
    assert!(props
        .stanza_changes
        .iter()
        .any(|s| s.name == "source::web_access"));

    // Merge local into default, write, and clean up.
    let mut merger = PackageMerger::new(&package, MergeMode::Merge).unwrap();
    assert!(merger.merge().success());
    assert!(merger.write().success());
    let removed = merger.cleanup_local_files();
    assert_eq!(removed.len(), 1);
    assert!(!package.join("local").exists());

    // Local values won, default-only values survived, new stanzas
    // were appended.
    let merged_text = fs::read_to_string(package.join("default/props.conf")).unwrap();
    let merged = parse(&merged_text).unwrap();
    let web = merged.stanza("source::web_access").unwrap();
    assert_eq!(web.get("TRUNCATE").unwrap().value.logical(), "20000");
    assert_eq!(web.get("SHOULD_LINEMERGE").unwrap().value.logical(), "true");
    assert_eq!(
        web.get("TRANSFORMS-null").unwrap().value.logical(),
        "drop_debug"
    );
    assert!(merged.stanza("source::*").is_some());

    // Metadata merged too.
    let meta = fs::read_to_string(package.join("metadata/default.meta")).unwrap();
    assert!(meta.contains("export = system"));

    // Sort the merged file into canonical order.
    let result = sort_file(&package.join("default/props.conf"), SortOptions::default()).unwrap();
    assert!(result.changed);
    let sorted = fs::read_to_string(package.join("default/props.conf")).unwrap();
    let default_pos = sorted.find("[default]").unwrap();
    let wildcard_pos = sorted.find("[source::*]").unwrap();
    let specific_pos = sorted.find("[source::web_access]").unwrap();
    assert!(default_pos < wildcard_pos && wildcard_pos < specific_pos);

    // With local/ gone, a re-scan reports a quiet package.
    let rescan = scan_package(&package, None).unwrap();
    assert!(rescan.is_valid);
    assert!(!rescan.has_changes());
}

#[test]
fn test_dry_run_merge_leaves_package_untouched() {
    let temp = tempfile::tempdir().unwrap();
    let package = temp.path().join("ta_example");
    copy_fixture(&package);

    let before = fs::read_to_string(package.join("default/props.conf")).unwrap();

    // merge() without write() only computes reports.
    let mut merger = PackageMerger::new(&package, MergeMode::Merge).unwrap();
    let outcome = merger.merge();
    assert!(outcome.success());
    assert_eq!(outcome.files.len(), 2);

    assert_eq!(
        fs::read_to_string(package.join("default/props.conf")).unwrap(),
        before
    );
    assert!(package.join("local/props.conf").exists());
}
