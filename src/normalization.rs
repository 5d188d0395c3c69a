//! Text cleanup for singing prompts
//!
//! Reduces arbitrary user text to the character set Bark sings reliably:
//! word characters, whitespace and light punctuation (`, . ! ? ' -`).

use regex::Regex;
use std::sync::OnceLock;

/// Keep at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Remove characters outside the singable set
fn remove_unknown_characters(text: &str) -> String {
    static UNKNOWN_RE: OnceLock<Regex> = OnceLock::new();
    let unknown_re = UNKNOWN_RE.get_or_init(|| Regex::new(r"[^\w\s,.!?'-]").unwrap());
    unknown_re.replace_all(text, "").into_owned()
}

/// Collapse whitespace runs into a single space
fn collapse_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();
    let ws_re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap());
    ws_re.replace_all(text, " ").trim().to_string()
}

/// Clean text for singing.
///
/// Truncates to `max_chars`, strips unsupported symbols and collapses
/// whitespace. The result is what segments must rejoin to.
pub fn clean_text(text: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(text, max_chars).trim();
    let stripped = remove_unknown_characters(truncated);
    collapse_whitespace(&stripped)
}
