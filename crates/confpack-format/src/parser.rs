//! Comment-preserving parser for conf files
//!
//! The grammar is INI-like with three extensions: multi-line value
//! continuation via a trailing backslash, several "global" stanza
//! forms, and embedded query-language values whose bracketed
//! substrings look identical to stanza headers. The scan is
//! line-oriented with lookahead; the header ambiguity heuristics live
//! in [`is_stanza_header`] so they can be tested independently of the
//! scan loop.

use std::sync::LazyLock;

use regex::Regex;

use crate::classify::classify;
use crate::error::{Error, Result};
use crate::model::{Comment, ParsedFile, Setting, SettingValue, Stanza};

/// `[name]` with optional surrounding whitespace
static STANZA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[(.*?)\]\s*$").unwrap());

/// `key = value`, with any trailing `# comment` stripped from the value
static SETTING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([^=\s]+)\s*=\s*(.*?)(?:\s*#.*)?$").unwrap());

/// Pipeline stages that mark a bracketed line as embedded query
/// content rather than a stanza header.
const QUERY_TOKENS: [&str; 9] = [
    "| foreach", "| map", "| search", "| where", "| eval", "| append", "| join", "| stats",
    "| sort",
];

/// Decide whether a line is a genuine stanza header.
///
/// A bracketed line is *not* a header when the previous line ended in
/// a continuation backslash (it is continuation content), when it
/// contains a known query pipeline token, or when the bracket
/// interior contains parentheses or pipes. This prevents the scan
/// from fracturing a multi-line embedded query on an internal `[...]`
/// substring.
pub fn is_stanza_header(line: &str, previous: Option<&str>) -> bool {
    let trimmed = line.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() >= 2) {
        return false;
    }

    if let Some(prev) = previous {
        if prev.trim_end().ends_with('\\') {
            return false;
        }
    }

    if QUERY_TOKENS.iter().any(|token| trimmed.contains(token)) {
        return false;
    }

    let interior = &trimmed[1..trimmed.len() - 1];
    if interior.contains('|') || interior.contains('(') || interior.contains(')') {
        return false;
    }

    true
}

/// Split a line into `(key, value)` if it matches the setting grammar.
/// The value has any trailing comment stripped.
fn setting_parts(line: &str) -> Option<(&str, &str)> {
    let captures = SETTING_PATTERN.captures(line)?;
    let key = captures.get(1)?.as_str();
    let value = captures.get(2).map(|m| m.as_str()).unwrap_or("");
    Some((key, value.trim()))
}

/// Whether a trimmed line is a comment (`#` or `;` marker).
fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with(';')
}

/// Whether an unindented line starts a new setting, ending any open
/// continuation. Indented `key = value` lines are continuation
/// content.
fn starts_new_setting(line: &str) -> bool {
    !line.starts_with(' ')
        && !line.starts_with('\t')
        && setting_parts(line.trim()).is_some()
}

/// Flatten a captured continuation block into a single logical value:
/// comment and blank lines are dropped, trailing backslashes removed,
/// the remaining fragments joined with single spaces.
fn flatten_block(first_value: &str, lines: &[&str]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let first = first_value.trim_end_matches('\\').trim();
    if !first.is_empty() {
        parts.push(first.to_string());
    }
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }
        let fragment = trimmed.trim_end_matches('\\').trim();
        if !fragment.is_empty() {
            parts.push(fragment.to_string());
        }
    }
    parts.join(" ")
}

/// Parse raw bytes, rejecting non-UTF-8 input before structural
/// parsing.
pub fn parse_bytes(bytes: &[u8]) -> Result<ParsedFile> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::encoding(e.to_string()))?;
    parse(text)
}

/// Parse conf text into a comment-preserving structured model.
pub fn parse(text: &str) -> Result<ParsedFile> {
    let lines: Vec<&str> = text.lines().collect();
    let mut file = ParsedFile::default();
    let mut pending_comments: Vec<Comment> = Vec::new();
    let mut current_stanza: Option<String> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let line_number = i + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if let Some(name) = &current_stanza {
                if let Some(stanza) = file.stanza_mut(name) {
                    stanza.blank_lines_after += 1;
                }
            }
            i += 1;
            continue;
        }

        if is_comment(trimmed) {
            pending_comments.push(Comment::new(trimmed, line_number));
            i += 1;
            continue;
        }

        let previous = if i > 0 { Some(lines[i - 1]) } else { None };
        if is_stanza_header(line, previous) {
            let name = STANZA_PATTERN
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();

            let mut stanza = Stanza::new(name.clone(), classify(&name), line_number);
            for mut comment in pending_comments.drain(..) {
                comment.associated_with = Some(format!("[{name}]"));
                stanza.comments.push(comment);
            }
            file.push_stanza(stanza);
            current_stanza = Some(name);
            i += 1;
            continue;
        }

        if let Some((key, value)) = setting_parts(trimmed) {
            let key = key.to_string();
            let start_line = line_number;
            let continued = value.ends_with('\\');

            let setting_value = if continued {
                let (raw_lines, next) = collect_continuation(&lines, i);
                let logical = flatten_block(value, &raw_lines[1..]);
                let raw = raw_lines.join("\n");
                i = next;
                SettingValue::MultiLine { logical, raw }
            } else {
                i += 1;
                SettingValue::SingleLine(value.to_string())
            };

            let mut setting = Setting {
                key: key.clone(),
                value: setting_value,
                line_number: start_line,
                comments: Vec::new(),
            };
            for mut comment in pending_comments.drain(..) {
                comment.associated_with = Some(key.clone());
                setting.comments.push(comment);
            }

            match &current_stanza {
                Some(name) => {
                    if let Some(stanza) = file.stanza_mut(name) {
                        stanza.upsert(setting);
                    }
                }
                None => {
                    match file.global_settings.iter_mut().find(|s| s.key == key) {
                        Some(existing) => *existing = setting,
                        None => file.global_settings.push(setting),
                    }
                }
            }
            continue;
        }

        // A lone opening bracket with no closing bracket anywhere on
        // the line is a malformed stanza header.
        if trimmed.starts_with('[') && !trimmed.contains(']') {
            return Err(Error::syntax(line_number, "unterminated stanza header"));
        }

        // Anything else (including guarded query-like bracket lines
        // outside a continuation) is skipped.
        i += 1;
    }

    Ok(file)
}

/// Collect a continuation block starting at `start` (the setting's
/// first line). Returns the verbatim lines of the block and the index
/// of the first line after it.
///
/// Comment and blank lines inside the block are captured verbatim. A
/// line that does not end in a backslash only terminates the block
/// when the next content line is unambiguously a new stanza or an
/// unindented setting.
fn collect_continuation<'a>(lines: &[&'a str], start: usize) -> (Vec<&'a str>, usize) {
    let mut raw_lines = vec![lines[start]];
    let mut j = start + 1;

    while j < lines.len() {
        let next = lines[j];
        let trimmed = next.trim();

        if trimmed.is_empty() || is_comment(trimmed) {
            raw_lines.push(next);
            j += 1;
            continue;
        }

        if is_stanza_header(next, Some(lines[j - 1])) {
            break;
        }

        if starts_new_setting(next) {
            break;
        }

        raw_lines.push(next);

        if !trimmed.ends_with('\\') {
            // Peek past blanks and comments: if the next content line
            // is a new stanza or setting, the block ends here.
            let mut k = j + 1;
            let mut ends = false;
            while k < lines.len() {
                let peek = lines[k].trim();
                if peek.is_empty() || is_comment(peek) {
                    k += 1;
                    continue;
                }
                if is_stanza_header(lines[k], Some(lines[k - 1]))
                    || starts_new_setting(lines[k])
                {
                    ends = true;
                }
                break;
            }
            if ends || k >= lines.len() {
                j += 1;
                break;
            }
        }

        j += 1;
    }

    (raw_lines, j)
}
