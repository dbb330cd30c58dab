//! Integration tests for package merge batches and scanning

use std::fs;
use std::path::{Path, PathBuf};

use confpack_core::{scan_package, PackageMerger, SortOptions};
use confpack_format::MergeMode;

fn make_package(root: &Path, name: &str) -> PathBuf {
    let package = root.join(name);
    fs::create_dir_all(package.join("default")).unwrap();
    fs::write(
        package.join("default/app.conf"),
        "[install]\nstate = enabled\n",
    )
    .unwrap();
    package
}

#[test]
fn test_merge_batch_combines_local_into_default() {
    let dir = tempfile::tempdir().unwrap();
    let package = make_package(dir.path(), "ta_web");
    fs::create_dir_all(package.join("local")).unwrap();
    fs::write(
        package.join("default/props.conf"),
        "[source::web]\nTRUNCATE = 10000\nCHARSET = UTF-8\n",
    )
    .unwrap();
    fs::write(
        package.join("local/props.conf"),
        "[source::web]\nTRUNCATE = 20000\n",
    )
    .unwrap();

    let mut merger = PackageMerger::new(&package, MergeMode::Merge).unwrap();
    assert!(merger.merge().success());
    assert!(merger.write().success());

    let merged = fs::read_to_string(package.join("default/props.conf")).unwrap();
    assert!(merged.contains("TRUNCATE = 20000"));
    assert!(merged.contains("CHARSET = UTF-8"));
}

#[test]
fn test_merge_copies_local_file_with_no_default_counterpart() {
    let dir = tempfile::tempdir().unwrap();
    let package = make_package(dir.path(), "ta_new");
    fs::create_dir_all(package.join("local")).unwrap();
    let content = "# fresh config\n[monitor:///var/log]\nindex = main\n";
    fs::write(package.join("local/inputs.conf"), content).unwrap();

    let mut merger = PackageMerger::new(&package, MergeMode::Merge).unwrap();
    merger.merge();
    assert!(merger.write().success());

    // The copy is byte-for-byte, comments included.
    assert_eq!(
        fs::read_to_string(package.join("default/inputs.conf")).unwrap(),
        content
    );
}

#[test]
fn test_bad_local_file_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let package = make_package(dir.path(), "ta_mixed");
    fs::create_dir_all(package.join("local")).unwrap();
    fs::write(package.join("local/good.conf"), "[a]\nx = 1\n").unwrap();
    fs::write(package.join("local/bad.conf"), "[unterminated\n").unwrap();

    let mut merger = PackageMerger::new(&package, MergeMode::Merge).unwrap();
    let outcome = merger.merge();
    assert!(!outcome.success());

    let bad = outcome.file(&package.join("local/bad.conf")).unwrap();
    assert!(bad.error.as_deref().unwrap().contains("error parsing file"));
    let good = outcome.file(&package.join("local/good.conf")).unwrap();
    assert!(good.success());

    merger.write();
    assert!(package.join("default/good.conf").exists());
    assert!(!package.join("default/bad.conf").exists());
}

#[test]
fn test_cleanup_removes_merged_locals_and_prunes_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    let package = make_package(dir.path(), "ta_clean");
    fs::create_dir_all(package.join("local")).unwrap();
    fs::write(package.join("local/props.conf"), "[a]\nx = 1\n").unwrap();

    let mut merger = PackageMerger::new(&package, MergeMode::Merge).unwrap();
    merger.merge();
    merger.write();
    let removed = merger.cleanup_local_files();

    assert_eq!(removed, vec![package.join("local/props.conf")]);
    assert!(!package.join("local").exists());
}

#[test]
fn test_failed_files_survive_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let package = make_package(dir.path(), "ta_keep");
    fs::create_dir_all(package.join("local")).unwrap();
    fs::write(package.join("local/bad.conf"), "[unterminated\n").unwrap();

    let mut merger = PackageMerger::new(&package, MergeMode::Merge).unwrap();
    merger.merge();
    merger.write();
    let removed = merger.cleanup_local_files();

    assert!(removed.is_empty());
    assert!(package.join("local/bad.conf").exists());
}

#[test]
fn test_metadata_local_meta_is_merged() {
    let dir = tempfile::tempdir().unwrap();
    let package = make_package(dir.path(), "ta_meta");
    fs::create_dir_all(package.join("metadata")).unwrap();
    fs::write(
        package.join("metadata/default.meta"),
        "[views]\nexport = none\n",
    )
    .unwrap();
    fs::write(
        package.join("metadata/local.meta"),
        "[views]\nexport = system\n",
    )
    .unwrap();

    let mut merger = PackageMerger::new(&package, MergeMode::Merge).unwrap();
    let outcome = merger.merge();
    assert!(outcome.file(&package.join("metadata/local.meta")).is_some());
    assert!(merger.write().success());

    let meta = fs::read_to_string(package.join("metadata/default.meta")).unwrap();
    assert!(meta.contains("export = system"));
}

#[test]
fn test_scan_reports_local_overrides_against_default() {
    let dir = tempfile::tempdir().unwrap();
    let package = make_package(dir.path(), "ta_scan");
    fs::create_dir_all(package.join("local")).unwrap();
    fs::write(
        package.join("local/app.conf"),
        "[install]\nstate = disabled\n",
    )
    .unwrap();
    fs::write(package.join("local/web.conf"), "[settings]\nport = 8000\n").unwrap();

    let result = scan_package(&package, None).unwrap();
    assert!(result.is_valid);
    assert_eq!(result.file_changes.len(), 2);

    let app = result
        .file_changes
        .iter()
        .find(|c| c.path == PathBuf::from("app.conf"))
        .unwrap();
    assert!(!app.is_new());
    assert_eq!(app.stanza_changes[0].name, "install");

    let web = result
        .file_changes
        .iter()
        .find(|c| c.path == PathBuf::from("web.conf"))
        .unwrap();
    assert!(web.is_new());
}

#[test]
fn test_sort_options_default_is_write_without_backup() {
    let options = SortOptions::default();
    assert!(!options.dry_run);
    assert!(!options.backup);
}
