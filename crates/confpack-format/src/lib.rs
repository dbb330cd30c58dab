//! Conf format engine for package configuration files
//!
//! Parsing, classification, priority sorting, merging, lossless
//! serialization, and change detection for the INI-like conf grammar
//! used by pluggable content packages.

pub mod classify;
pub mod diff;
pub mod error;
pub mod merge;
pub mod model;
pub mod parser;
pub mod sort;
pub mod writer;

pub use classify::classify;
pub use diff::{diff_settings, diff_sources, ChangeKind, SettingChange, StanzaChange};
pub use error::{Error, Result};
pub use merge::{merge, MergeDisposition, MergeMode, MergeReport, StanzaMergeOutcome};
pub use model::{Comment, ParsedFile, Setting, SettingValue, Stanza, StanzaType};
pub use parser::{is_stanza_header, parse, parse_bytes};
pub use sort::{sort, SortReport};
pub use writer::write;
