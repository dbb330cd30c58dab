//! Priority sorter encoding the host application's resolution order
//!
//! The resulting order is a total order over (type group, name):
//! global settings first, then the `[]`, `[*]`, and `[default]`
//! stanzas, then plain named stanzas alphabetically, then global
//! wildcards alphabetically, and finally the qualified stanzas
//! grouped by type prefix. Within each prefix group the wildcard
//! stanza comes first, wildcard-prefix stanzas next, and fully
//! qualified stanzas last, each alphabetical. Settings are sorted
//! alphabetically within every stanza; comments stay bound to their
//! owners.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::type_prefix;
use crate::model::{ParsedFile, Stanza, StanzaType};

/// Counters and warnings produced by a sort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortReport {
    /// Stanzas whose position changed
    pub stanzas_reordered: usize,
    /// Settings whose position within their stanza changed
    pub settings_sorted: usize,
    /// Comments carried through the sort
    pub comments_preserved: usize,
    /// Structural warnings (conflicting global declarations,
    /// duplicated stanza names)
    pub warnings: Vec<String>,
}

/// Sort a parsed file into canonical priority order.
pub fn sort(file: ParsedFile) -> (ParsedFile, SortReport) {
    let mut report = SortReport {
        comments_preserved: file.comment_count(),
        ..SortReport::default()
    };

    check_global_conflicts(&file, &mut report);
    for name in &file.duplicate_stanzas {
        report.warnings.push(format!(
            "stanza [{name}] appears more than once; the last occurrence wins"
        ));
    }

    let ParsedFile {
        mut global_settings,
        stanzas,
        duplicate_stanzas,
    } = file;

    // Global settings, alphabetical by key.
    let original_keys: Vec<String> =
        global_settings.iter().map(|s| s.key.clone()).collect();
    global_settings.sort_by(|a, b| a.key.cmp(&b.key));
    report.settings_sorted += moved_count(
        &original_keys,
        &global_settings.iter().map(|s| s.key.clone()).collect::<Vec<_>>(),
    );

    let original_order: Vec<String> = stanzas.iter().map(|s| s.name.clone()).collect();

    let mut empty = Vec::new();
    let mut star = Vec::new();
    let mut default = Vec::new();
    let mut app_specific = Vec::new();
    let mut global_wildcard = Vec::new();
    let mut typed: BTreeMap<String, Vec<Stanza>> = BTreeMap::new();

    for mut stanza in stanzas {
        sort_settings(&mut stanza, &mut report);
        match stanza.kind {
            StanzaType::Empty => empty.push(stanza),
            StanzaType::Star => star.push(stanza),
            StanzaType::Default => default.push(stanza),
            StanzaType::AppSpecific => app_specific.push(stanza),
            StanzaType::GlobalWildcard => global_wildcard.push(stanza),
            StanzaType::TypeWildcard
            | StanzaType::TypeWildcardPrefix
            | StanzaType::TypeSpecific => {
                let prefix = type_prefix(&stanza.name).unwrap_or(&stanza.name).to_string();
                typed.entry(prefix).or_default().push(stanza);
            }
        }
    }

    app_specific.sort_by(|a, b| a.name.cmp(&b.name));
    global_wildcard.sort_by(|a, b| a.name.cmp(&b.name));

    let mut ordered = Vec::new();
    ordered.extend(empty);
    ordered.extend(star);
    ordered.extend(default);
    ordered.extend(app_specific);
    ordered.extend(global_wildcard);

    for (_, mut group) in typed {
        group.sort_by(|a, b| (type_rank(a.kind), &a.name).cmp(&(type_rank(b.kind), &b.name)));
        ordered.extend(group);
    }

    let new_order: Vec<String> = ordered.iter().map(|s| s.name.clone()).collect();
    report.stanzas_reordered = moved_count(&original_order, &new_order);

    (
        ParsedFile {
            global_settings,
            stanzas: ordered,
            duplicate_stanzas,
        },
        report,
    )
}

/// Rank of a qualified stanza within its type-prefix group.
fn type_rank(kind: StanzaType) -> u8 {
    match kind {
        StanzaType::TypeWildcard => 0,
        StanzaType::TypeWildcardPrefix => 1,
        _ => 2,
    }
}

fn sort_settings(stanza: &mut Stanza, report: &mut SortReport) {
    let original: Vec<String> = stanza.settings.iter().map(|s| s.key.clone()).collect();
    stanza.settings.sort_by(|a, b| a.key.cmp(&b.key));
    let sorted: Vec<String> = stanza.settings.iter().map(|s| s.key.clone()).collect();
    report.settings_sorted += moved_count(&original, &sorted);
}

/// Number of elements whose index changed between two orderings.
fn moved_count(before: &[String], after: &[String]) -> usize {
    before
        .iter()
        .enumerate()
        .filter(|(idx, name)| after.get(*idx) != Some(name))
        .count()
}

/// More than one of {non-empty globals, `[]`, `[*]`, `[default]`} in
/// one file leaves the combined runtime precedence undefined; emit a
/// single structural warning.
fn check_global_conflicts(file: &ParsedFile, report: &mut SortReport) {
    let mut forms: Vec<&str> = Vec::new();
    if !file.global_settings.is_empty() {
        forms.push("bare global settings");
    }
    for stanza in &file.stanzas {
        match stanza.kind {
            StanzaType::Empty => forms.push("[]"),
            StanzaType::Star => forms.push("[*]"),
            StanzaType::Default => forms.push("[default]"),
            _ => {}
        }
    }
    if forms.len() > 1 {
        report.warnings.push(format!(
            "multiple global declarations ({}) have undefined combined precedence",
            forms.join(", ")
        ));
    }
}
