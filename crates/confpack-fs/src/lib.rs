//! Filesystem layer for confpack
//!
//! Safe reads and writes, scoped write-safety backups, conf file
//! discovery, and the package directory contract.

pub mod backup;
pub mod discover;
pub mod error;
pub mod io;
pub mod package;

pub use backup::{create_backup, WriteGuard};
pub use discover::{conf_files, files_identical, is_binary, local_conf_files, match_conf_files};
pub use error::{Error, Result};
pub use io::{read_to_string, write_atomic, write_text};
pub use package::{find_packages, is_valid_package, PackageLayout};
