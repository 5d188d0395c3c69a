//! Sentence splitting and greedy packing
//!
//! Sentences end at a run of `.`, `!` or `?` followed by whitespace or the end
//! of the text; the run stays attached to the sentence it closes. Terminators
//! inside a token (`2.0`, `e.g.this`) do not split. Packing joins pieces with single spaces and never lets
//! a packed piece grow past the limit unless the piece alone already does.

use regex::Regex;
use std::sync::OnceLock;

/// Split cleaned text into sentences, keeping terminal punctuation.
///
/// Every split point is whitespace, so joining the sentences of
/// whitespace-collapsed text with single spaces gives the text back.
pub fn split_sentences(text: &str) -> Vec<String> {
    static BOUNDARY_RE: OnceLock<Regex> = OnceLock::new();
    let boundary_re = BOUNDARY_RE.get_or_init(|| Regex::new(r"[.!?]+(\s+|$)").unwrap());

    let mut sentences = Vec::new();
    let mut start = 0;
    for m in boundary_re.find_iter(text) {
        sentences.push(&text[start..m.end()]);
        start = m.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Greedily pack pieces into groups of at most `max_chars` characters.
///
/// A piece joins the open group when the joined length, separator included,
/// stays within the limit. Otherwise the group closes and the piece opens a
/// new one, even if it is longer than `max_chars` on its own.
pub fn pack_greedy<I, S>(pieces: I, max_chars: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut packed = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for piece in pieces {
        let piece = piece.as_ref();
        let piece_len = piece.chars().count();

        if current.is_empty() {
            current.push_str(piece);
            current_len = piece_len;
        } else if current_len + 1 + piece_len <= max_chars {
            current.push(' ');
            current.push_str(piece);
            current_len += 1 + piece_len;
        } else {
            packed.push(std::mem::take(&mut current));
            current.push_str(piece);
            current_len = piece_len;
        }
    }

    if !current.is_empty() {
        packed.push(current);
    }

    packed
}

/// Re-pack an over-long piece word by word. Words are never split.
pub fn split_words(text: &str, max_chars: usize) -> Vec<String> {
    pack_greedy(text.split_whitespace(), max_chars)
}
