//! Structured model for parsed configuration files

use serde::{Deserialize, Serialize};

/// Structural classification of a stanza name.
///
/// Classification is a pure function of the name string; see
/// [`crate::classify`]. The variants cover the host application's
/// resolution order, from the "applies to everything" forms down to
/// fully qualified `type::attribute` stanzas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StanzaType {
    /// Empty stanza `[]`
    Empty,
    /// Star stanza `[*]`
    Star,
    /// Default stanza `[default]`
    Default,
    /// Plain named stanza with no type specifier, e.g. `[perfmon]`
    AppSpecific,
    /// Global wildcard stanza `[*::attribute]`
    GlobalWildcard,
    /// Type wildcard stanza `[type::*]`
    TypeWildcard,
    /// Type wildcard with a suffix, e.g. `[type::*-attribute]`
    TypeWildcardPrefix,
    /// Fully qualified stanza `[type::attribute]`
    TypeSpecific,
}

/// A comment line, stored verbatim (marker included) so the writer
/// can reproduce it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Trimmed original comment line, e.g. `# collect everything`
    pub text: String,
    /// 1-based line number in the source file
    pub line_number: usize,
    /// Name of the stanza or setting this comment precedes, if any
    pub associated_with: Option<String>,
}

impl Comment {
    pub fn new(text: impl Into<String>, line_number: usize) -> Self {
        Self {
            text: text.into(),
            line_number,
            associated_with: None,
        }
    }
}

/// A setting value: either a plain single-line string or a verbatim
/// multi-line continuation block.
///
/// The `raw` block of a multi-line value preserves the original
/// backslash layout, indentation, and any comment or blank lines
/// embedded inside the continuation. The `logical` form flattens the
/// block for value comparisons; it is never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    SingleLine(String),
    MultiLine { logical: String, raw: String },
}

impl SettingValue {
    /// The value used for equality comparisons during merge and diff.
    pub fn logical(&self) -> &str {
        match self {
            Self::SingleLine(v) => v,
            Self::MultiLine { logical, .. } => logical,
        }
    }

    pub fn is_multi_line(&self) -> bool {
        matches!(self, Self::MultiLine { .. })
    }
}

/// A `key = value` setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: SettingValue,
    /// 1-based line number of the first line of the setting
    pub line_number: usize,
    /// Comments immediately preceding the setting
    pub comments: Vec<Comment>,
}

impl Setting {
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: SettingValue::SingleLine(value.into()),
            line_number: 0,
            comments: Vec::new(),
        }
    }
}

/// A named `[stanza]` and its settings.
///
/// Setting keys are unique within a stanza; the parser keeps the last
/// occurrence when a key repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stanza {
    pub name: String,
    pub kind: StanzaType,
    pub line_number: usize,
    pub settings: Vec<Setting>,
    pub comments: Vec<Comment>,
    /// Blank lines following the stanza body in the source
    pub blank_lines_after: usize,
}

impl Stanza {
    pub fn new(name: impl Into<String>, kind: StanzaType, line_number: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            line_number,
            settings: Vec::new(),
            comments: Vec::new(),
            blank_lines_after: 0,
        }
    }

    /// Look up a setting by key.
    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Setting> {
        self.settings.iter_mut().find(|s| s.key == key)
    }

    /// Insert a setting, replacing any existing setting with the same
    /// key in place (last wins).
    pub fn upsert(&mut self, setting: Setting) {
        match self.get_mut(&setting.key) {
            Some(existing) => *existing = setting,
            None => self.settings.push(setting),
        }
    }

    /// Setting keys in their current order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.settings.iter().map(|s| s.key.as_str())
    }
}

/// A complete parsed configuration file.
///
/// Stanza names are unique within a file. When a name repeats in the
/// source, the last occurrence wins (keeping the original position)
/// and the name is recorded in `duplicate_stanzas` so downstream
/// operations can surface a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    /// Settings appearing before any stanza header
    pub global_settings: Vec<Setting>,
    pub stanzas: Vec<Stanza>,
    /// Stanza names that occurred more than once in the source
    pub duplicate_stanzas: Vec<String>,
}

impl ParsedFile {
    /// Look up a stanza by name.
    pub fn stanza(&self, name: &str) -> Option<&Stanza> {
        self.stanzas.iter().find(|s| s.name == name)
    }

    pub fn stanza_mut(&mut self, name: &str) -> Option<&mut Stanza> {
        self.stanzas.iter_mut().find(|s| s.name == name)
    }

    /// Add a stanza. A repeated name replaces the earlier stanza in
    /// place and is recorded as a duplicate.
    pub fn push_stanza(&mut self, stanza: Stanza) {
        if let Some(existing) = self.stanza_mut(&stanza.name) {
            let name = stanza.name.clone();
            *existing = stanza;
            self.duplicate_stanzas.push(name);
        } else {
            self.stanzas.push(stanza);
        }
    }

    /// Total number of comments attached anywhere in the file.
    pub fn comment_count(&self) -> usize {
        let in_settings = |settings: &[Setting]| -> usize {
            settings.iter().map(|s| s.comments.len()).sum()
        };
        in_settings(&self.global_settings)
            + self
                .stanzas
                .iter()
                .map(|st| st.comments.len() + in_settings(&st.settings))
                .sum::<usize>()
    }
}
