//! Text chunking for sung synthesis
//!
//! Bark produces its most stable singing on prompts of roughly 80-120
//! characters. This module turns free-form input into an ordered list of
//! segments within that budget:
//!
//! 1. Clean the text (truncate, strip symbols, collapse whitespace)
//! 2. Split into sentences, punctuation runs attached
//! 3. Greedily pack sentences into segments of at most `max_segment_chars`
//! 4. Re-pack any segment that is still too long word by word
//!
//! Joining the segments with single spaces gives back the cleaned text.

use tracing::debug;

use crate::config::ChunkerConfig;
use crate::normalization::clean_text;
use crate::splitter::{pack_greedy, split_sentences, split_words};

/// A text segment ready for one synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    /// Position of the segment in the input
    pub index: usize,
    /// The text content to sing
    pub text: String,
}

impl TextSegment {
    /// Create a new segment with the given position and text
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Get the number of characters in the segment
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Check if the segment is empty (after trimming)
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Chunk text using the limits in `config`.
pub fn chunk_with_config(text: &str, config: &ChunkerConfig) -> Vec<TextSegment> {
    chunk(text, config.max_total_chars, config.max_segment_chars)
}

/// Split `text` into ordered segments of at most `max_segment_chars`.
///
/// Always returns at least one segment. Input that cleans down to nothing
/// yields a single empty segment; callers reject empty text before this.
pub fn chunk(text: &str, max_total_chars: usize, max_segment_chars: usize) -> Vec<TextSegment> {
    let cleaned = clean_text(text, max_total_chars);
    let sentences = split_sentences(&cleaned);

    let mut packed = pack_greedy(&sentences, max_segment_chars);
    if packed.is_empty() {
        packed.push(cleaned.clone());
    }

    let texts: Vec<String> = packed
        .into_iter()
        .flat_map(|segment| {
            if segment.chars().count() > max_segment_chars {
                debug!(
                    len = segment.chars().count(),
                    max_segment_chars, "segment over limit, re-splitting by words"
                );
                split_words(&segment, max_segment_chars)
            } else {
                vec![segment]
            }
        })
        .collect();

    let segments: Vec<TextSegment> = texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextSegment::new(index, text))
        .collect();

    debug!(
        input_chars = text.chars().count(),
        cleaned_chars = cleaned.chars().count(),
        segments = segments.len(),
        "text formatted into singing segments"
    );
    for segment in &segments {
        debug!(
            index = segment.index,
            chars = segment.char_count(),
            preview = %preview(&segment.text, 70),
            "segment"
        );
    }

    segments
}

/// First `max_chars` characters of `text`, for log lines.
pub(crate) fn preview(text: &str, max_chars: usize) -> &str {
    crate::normalization::truncate_chars(text, max_chars)
}
