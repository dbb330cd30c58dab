//! Merge engine combining a local override file with a default file
//!
//! Two strategies are supported. Merge combines per key, local value
//! winning; Replace supersedes a same-named default stanza wholesale.
//! Either way the result preserves the default file's stanza and
//! setting order, appending new local material at the end, and keeps
//! verbatim multi-line blocks from whichever side supplied the final
//! value.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{ParsedFile, Stanza};

/// Merge strategy for combining local overrides with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMode {
    /// Combine per key, preferring local values
    Merge,
    /// A local stanza wholly supersedes its default counterpart
    Replace,
}

/// How a stanza fared in the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeDisposition {
    /// Present only in local
    New,
    /// Present in both and combined (or superseded, in Replace mode)
    Merged,
    /// Present only in default, carried through untouched
    Preserved,
}

/// Per-stanza outcome of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanzaMergeOutcome {
    pub name: String,
    pub disposition: MergeDisposition,
    /// Keys present only in local
    pub settings_added: BTreeSet<String>,
    /// Keys present in both whose value changed (all local keys, in
    /// Replace mode)
    pub settings_updated: BTreeSet<String>,
    /// Keys present only in default
    pub settings_preserved: BTreeSet<String>,
    /// Set when this stanza could not be merged; the rest of the file
    /// is unaffected
    pub error: Option<String>,
}

impl StanzaMergeOutcome {
    fn new(name: impl Into<String>, disposition: MergeDisposition) -> Self {
        Self {
            name: name.into(),
            disposition,
            settings_added: BTreeSet::new(),
            settings_updated: BTreeSet::new(),
            settings_preserved: BTreeSet::new(),
            error: None,
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate report for one file's merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub stanzas: Vec<StanzaMergeOutcome>,
}

impl MergeReport {
    pub fn outcome(&self, name: &str) -> Option<&StanzaMergeOutcome> {
        self.stanzas.iter().find(|s| s.name == name)
    }

    pub fn names_with(&self, disposition: MergeDisposition) -> BTreeSet<String> {
        self.stanzas
            .iter()
            .filter(|s| s.disposition == disposition)
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn success(&self) -> bool {
        self.stanzas.iter().all(StanzaMergeOutcome::success)
    }

    fn push(&mut self, outcome: StanzaMergeOutcome) {
        self.stanzas.push(outcome);
    }
}

/// Merge a local file into an optional default file.
///
/// With no default, the local file passes through verbatim and every
/// stanza is reported as new.
pub fn merge(
    local: ParsedFile,
    default: Option<ParsedFile>,
    mode: MergeMode,
) -> (ParsedFile, MergeReport) {
    let mut report = MergeReport::default();

    let Some(default) = default else {
        for stanza in &local.stanzas {
            let mut outcome = StanzaMergeOutcome::new(&stanza.name, MergeDisposition::New);
            outcome
                .settings_added
                .extend(stanza.keys().map(str::to_string));
            report.push(outcome);
        }
        return (local, report);
    };

    let mut merged = ParsedFile {
        global_settings: default.global_settings,
        stanzas: Vec::new(),
        duplicate_stanzas: Vec::new(),
    };

    let mut local_stanzas: Vec<Option<Stanza>> = local.stanzas.into_iter().map(Some).collect();

    // Default order first: shared stanzas are combined (or replaced),
    // default-only stanzas carried through.
    for default_stanza in default.stanzas {
        let local_match = local_stanzas
            .iter_mut()
            .find(|slot| {
                slot.as_ref()
                    .is_some_and(|s| s.name == default_stanza.name)
            })
            .and_then(Option::take);

        match local_match {
            Some(local_stanza) => {
                let (stanza, outcome) = merge_stanza(local_stanza, default_stanza, mode);
                merged.stanzas.push(stanza);
                report.push(outcome);
            }
            None => {
                let mut outcome =
                    StanzaMergeOutcome::new(&default_stanza.name, MergeDisposition::Preserved);
                outcome
                    .settings_preserved
                    .extend(default_stanza.keys().map(str::to_string));
                merged.stanzas.push(default_stanza);
                report.push(outcome);
            }
        }
    }

    // Local-only stanzas appended in local order.
    for stanza in local_stanzas.into_iter().flatten() {
        let mut outcome = StanzaMergeOutcome::new(&stanza.name, MergeDisposition::New);
        outcome
            .settings_added
            .extend(stanza.keys().map(str::to_string));
        merged.stanzas.push(stanza);
        report.push(outcome);
    }

    (merged, report)
}

/// Combine one stanza present on both sides.
fn merge_stanza(
    local: Stanza,
    default: Stanza,
    mode: MergeMode,
) -> (Stanza, StanzaMergeOutcome) {
    let mut outcome = StanzaMergeOutcome::new(&local.name, MergeDisposition::Merged);

    if mode == MergeMode::Replace {
        // Wholesale supersession: every local setting counts as an
        // update, no per-key merge.
        outcome
            .settings_updated
            .extend(local.keys().map(str::to_string));
        return (local, outcome);
    }

    // Default's order and comments are the base; local values win per
    // key, keeping their verbatim blocks.
    let local_keys: BTreeSet<String> = local.keys().map(str::to_string).collect();
    let mut result = default;
    for local_setting in local.settings {
        match result.get(&local_setting.key) {
            Some(default_setting) => {
                if default_setting.value.logical() != local_setting.value.logical() {
                    outcome.settings_updated.insert(local_setting.key.clone());
                }
            }
            None => {
                outcome.settings_added.insert(local_setting.key.clone());
            }
        }
        result.upsert(local_setting);
    }
    for key in result.keys() {
        if !local_keys.contains(key) {
            outcome.settings_preserved.insert(key.to_string());
        }
    }

    (result, outcome)
}
