//! Orchestration layer for confpack
//!
//! Package-level merge batches, the file sorting pipeline, tree
//! change scanning, and version management, built on the format
//! engine and the filesystem layer.

pub mod error;
pub mod logging;
pub mod merge;
pub mod scan;
pub mod sort;
pub mod version;

pub use error::{Error, Result};
pub use merge::{FileMergeResult, MergeOutcome, PackageMerger};
pub use scan::{diff_files, diff_trees, scan_package, FileChange, ScanResult};
pub use sort::{sort_file, sort_source, SortFileResult, SortOptions};
pub use version::{read_version, update_version, update_versions};
