//! Deterministic serializer for the structured model
//!
//! The writer performs no reordering of its own: stanzas and settings
//! are emitted in the order the model holds them. A setting with a
//! captured verbatim multi-line block is written back byte for byte;
//! everything else is rendered as `key = value`.

use crate::model::{ParsedFile, Setting};

/// Serialize a parsed file back to conf text.
pub fn write(file: &ParsedFile) -> String {
    let mut out = String::new();

    for setting in &file.global_settings {
        write_setting(&mut out, setting);
    }
    if !file.global_settings.is_empty() && !file.stanzas.is_empty() {
        out.push('\n');
    }

    for stanza in &file.stanzas {
        for comment in &stanza.comments {
            out.push_str(&comment.text);
            out.push('\n');
        }
        out.push('[');
        out.push_str(&stanza.name);
        out.push_str("]\n");

        for setting in &stanza.settings {
            write_setting(&mut out, setting);
        }

        for _ in 0..stanza.blank_lines_after {
            out.push('\n');
        }
    }

    out
}

fn write_setting(out: &mut String, setting: &Setting) {
    for comment in &setting.comments {
        out.push_str(&comment.text);
        out.push('\n');
    }
    match &setting.value {
        crate::model::SettingValue::SingleLine(value) => {
            out.push_str(&setting.key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
        crate::model::SettingValue::MultiLine { raw, .. } => {
            out.push_str(raw);
            if !raw.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}
