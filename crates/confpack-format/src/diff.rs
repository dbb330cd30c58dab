//! Stanza-level change detection
//!
//! The detector runs over raw text with a lightweight line scan that
//! shares only the stanza-header ambiguity guard with the full
//! parser. It builds `name -> {key -> value}` maps (continuations
//! flattened, comments dropped) and diffs them key by key, so it can
//! run over large trees without constructing the comment-aware model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::parser::is_stanza_header;

/// Kind of change detected at stanza or setting granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// A change to one setting.
///
/// `local_value` is the value on the current side, `default_value`
/// the value on the base side; either is absent when the setting only
/// exists on one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingChange {
    pub name: String,
    pub kind: ChangeKind,
    pub local_value: Option<String>,
    pub default_value: Option<String>,
}

/// Changes to one stanza, with per-setting detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanzaChange {
    pub name: String,
    pub kind: ChangeKind,
    pub settings: Vec<SettingChange>,
}

impl StanzaChange {
    fn new(name: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            settings: Vec::new(),
        }
    }

    fn push_setting(
        &mut self,
        name: &str,
        kind: ChangeKind,
        local_value: Option<&str>,
        default_value: Option<&str>,
    ) {
        self.settings.push(SettingChange {
            name: name.to_string(),
            kind,
            local_value: local_value.map(str::to_string),
            default_value: default_value.map(str::to_string),
        });
    }
}

/// Scan conf text into `stanza -> {key -> value}` maps.
///
/// Continuation blocks are flattened into one logical value; comment
/// lines inside them are dropped. Settings before the first stanza
/// header are ignored, as the detector works at stanza granularity.
pub fn scan_settings(text: &str) -> BTreeMap<String, BTreeMap<String, String>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut stanzas: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut current: Option<String> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            i += 1;
            continue;
        }

        let previous = if i > 0 { Some(lines[i - 1]) } else { None };
        if is_stanza_header(line, previous) {
            let name = trimmed[1..trimmed.len() - 1].to_string();
            stanzas.entry(name.clone()).or_default();
            current = Some(name);
            i += 1;
            continue;
        }

        if let (Some(stanza), Some((key, value))) = (&current, trimmed.split_once('=')) {
            let key = key.trim().to_string();
            let value = value.trim();
            let continued = value.ends_with('\\');
            let first = if continued { value } else { strip_trailing_comment(value) };
            let mut parts = vec![first.trim_end_matches('\\').trim().to_string()];
            let mut ended = !continued;
            let mut j = i + 1;

            while !ended && j < lines.len() {
                let next = lines[j].trim();
                if next.is_empty() || next.starts_with('#') || next.starts_with(';') {
                    j += 1;
                    continue;
                }
                if is_stanza_header(lines[j], Some(lines[j - 1])) {
                    break;
                }
                parts.push(next.trim_end_matches('\\').trim().to_string());
                ended = !next.ends_with('\\');
                j += 1;
            }

            let value = parts
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(settings) = stanzas.get_mut(stanza) {
                settings.insert(key, value);
            }
            i = j.max(i + 1);
            continue;
        }

        i += 1;
    }

    stanzas
}

/// Strip a trailing `# comment` from a single-line value, matching
/// the full parser's treatment.
fn strip_trailing_comment(value: &str) -> &str {
    match value.split_once('#') {
        Some((head, _)) => head.trim_end(),
        None => value,
    }
}

/// Diff two scanned setting maps into per-stanza change records.
///
/// `base` plays the "default" role and `current` the "local" role in
/// the emitted values. Output is deterministic: stanzas and settings
/// appear in name order, with added settings first, then removed,
/// then modified.
pub fn diff_settings(
    base: &BTreeMap<String, BTreeMap<String, String>>,
    current: &BTreeMap<String, BTreeMap<String, String>>,
) -> Vec<StanzaChange> {
    let mut changes = Vec::new();

    for (name, settings) in current {
        if !base.contains_key(name) {
            let mut change = StanzaChange::new(name, ChangeKind::Added);
            for (key, value) in settings {
                change.push_setting(key, ChangeKind::Added, Some(value), None);
            }
            changes.push(change);
        }
    }

    for (name, settings) in base {
        if !current.contains_key(name) {
            let mut change = StanzaChange::new(name, ChangeKind::Removed);
            for (key, value) in settings {
                change.push_setting(key, ChangeKind::Removed, None, Some(value));
            }
            changes.push(change);
        }
    }

    for (name, base_settings) in base {
        let Some(current_settings) = current.get(name) else {
            continue;
        };
        if base_settings == current_settings {
            continue;
        }

        let mut change = StanzaChange::new(name, ChangeKind::Modified);
        for (key, value) in current_settings {
            if !base_settings.contains_key(key) {
                change.push_setting(key, ChangeKind::Added, Some(value), None);
            }
        }
        for (key, value) in base_settings {
            if !current_settings.contains_key(key) {
                change.push_setting(key, ChangeKind::Removed, None, Some(value));
            }
        }
        for (key, base_value) in base_settings {
            if let Some(current_value) = current_settings.get(key) {
                if base_value != current_value {
                    change.push_setting(
                        key,
                        ChangeKind::Modified,
                        Some(current_value),
                        Some(base_value),
                    );
                }
            }
        }
        changes.push(change);
    }

    changes.sort_by(|a, b| a.name.cmp(&b.name));
    changes
}

/// Diff two conf sources directly.
pub fn diff_sources(base: &str, current: &str) -> Vec<StanzaChange> {
    diff_settings(&scan_settings(base), &scan_settings(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_flattens_continuations() {
        let text = "[x]\nquery = a \\\n    b \\\n    c\nplain = 1\n";
        let scanned = scan_settings(text);
        assert_eq!(scanned["x"]["query"], "a b c");
        assert_eq!(scanned["x"]["plain"], "1");
    }

    #[test]
    fn scan_does_not_split_on_embedded_brackets() {
        let text = "[x]\nquery = search \\\n    [subsearch] \\\n    | stats count\n";
        let scanned = scan_settings(text);
        assert_eq!(scanned.len(), 1);
        assert!(scanned["x"]["query"].contains("[subsearch]"));
    }

    #[test]
    fn scan_strips_trailing_value_comments() {
        let scanned = scan_settings("[x]\nindex = main # routed\n");
        assert_eq!(scanned["x"]["index"], "main");
    }

    #[test]
    fn diff_reports_added_removed_modified() {
        let base = "[a]\nk = 1\n\n[b]\nk = 2\n";
        let current = "[a]\nk = 9\nnew = 3\n\n[c]\nk = 4\n";
        let changes = diff_sources(base, current);

        let by_name: BTreeMap<&str, &StanzaChange> =
            changes.iter().map(|c| (c.name.as_str(), c)).collect();
        assert_eq!(by_name["a"].kind, ChangeKind::Modified);
        assert_eq!(by_name["b"].kind, ChangeKind::Removed);
        assert_eq!(by_name["c"].kind, ChangeKind::Added);

        let modified: Vec<&SettingChange> = by_name["a"]
            .settings
            .iter()
            .filter(|s| s.kind == ChangeKind::Modified)
            .collect();
        assert_eq!(modified.len(), 1);
        assert_eq!(modified[0].local_value.as_deref(), Some("9"));
        assert_eq!(modified[0].default_value.as_deref(), Some("1"));
    }

    #[test]
    fn diff_is_symmetric_for_added_and_removed() {
        let a = "[only_a]\nx = 1\n\n[shared]\nk = 1\n";
        let b = "[only_b]\ny = 2\n\n[shared]\nk = 1\n";

        let forward = diff_sources(a, b);
        let backward = diff_sources(b, a);

        let added: Vec<&str> = forward
            .iter()
            .filter(|c| c.kind == ChangeKind::Added)
            .map(|c| c.name.as_str())
            .collect();
        let removed: Vec<&str> = backward
            .iter()
            .filter(|c| c.kind == ChangeKind::Removed)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(added, removed);
    }
}
