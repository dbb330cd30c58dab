//! Stanza name classification
//!
//! Classification is a pure, total function of the name string alone.
//! The checks run from most to least specific: the global forms first,
//! then wildcard patterns, then plain `::` containment. Order matters
//! because `type::*-attr` also contains `::*`, and `*::attr` also
//! contains `::`.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::StanzaType;

/// `::*` followed by at least one more character, e.g. `type::*-attr`
static TYPE_WILDCARD_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::\*.").unwrap());

/// Classify a stanza name into its structural type.
pub fn classify(name: &str) -> StanzaType {
    if name.is_empty() {
        StanzaType::Empty
    } else if name == "*" {
        StanzaType::Star
    } else if name.eq_ignore_ascii_case("default") {
        StanzaType::Default
    } else if name.contains("*::") {
        StanzaType::GlobalWildcard
    } else if TYPE_WILDCARD_PREFIX.is_match(name) {
        StanzaType::TypeWildcardPrefix
    } else if name.contains("::*") {
        StanzaType::TypeWildcard
    } else if name.contains("::") {
        StanzaType::TypeSpecific
    } else {
        StanzaType::AppSpecific
    }
}

/// The type prefix of a qualified stanza name (the part before `::`),
/// used for grouping during sort.
pub fn type_prefix(name: &str) -> Option<&str> {
    name.split_once("::").map(|(prefix, _)| prefix)
}
