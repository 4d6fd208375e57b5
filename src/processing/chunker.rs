/*!
 * Sentence-aware text chunking.
 *
 * Long transcripts are split into chunks no larger than a character budget
 * so that each backend request stays within its size limit. Splits only
 * happen at sentence terminators (`.`, `!`, `?` and the full-width `。`,
 * `！`, `？`); a sentence that alone exceeds the budget is kept whole.
 */

use once_cell::sync::Lazy;
use regex::Regex;

// @const: Sentence terminator run plus any trailing whitespace
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.!?。！？]+\s*").unwrap()
});

/// One ordered, contiguous piece of a longer text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the source text
    pub index: usize,
    /// Chunk text; sentences are joined with single spaces
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Splits text into size-bounded chunks
pub trait TextSplitter: Send + Sync {
    /// Split `text` into ordered chunks of at most `max_size` characters
    fn split(&self, text: &str, max_size: usize) -> Vec<Chunk>;
}

/// Greedy sentence packer
#[derive(Debug, Default, Clone, Copy)]
pub struct SentenceChunker;

impl SentenceChunker {
    pub fn new() -> Self {
        Self
    }
}

impl TextSplitter for SentenceChunker {
    fn split(&self, text: &str, max_size: usize) -> Vec<Chunk> {
        split_text(text, max_size)
    }
}

/// Character length, so full-width text counts one per glyph
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Break text into trimmed sentence units, dropping empty ones
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        let unit = text[start..m.end()].trim();
        if !unit.is_empty() {
            units.push(unit);
        }
        start = m.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        units.push(tail);
    }

    units
}

/// Split `text` into chunks of at most `max_size` characters.
///
/// Text that already fits is returned as a single chunk, untouched.
/// Otherwise sentences are packed greedily: a sentence joins the current
/// chunk while `current + sentence + 1 <= max_size` (the `1` is the joining
/// space), else the chunk is closed and the sentence starts a new one.
pub fn split_text(text: &str, max_size: usize) -> Vec<Chunk> {
    if char_len(text) <= max_size {
        return vec![Chunk::new(0, text)];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0;

    for unit in split_sentences(text) {
        let unit_size = char_len(unit);

        if !current.is_empty() && current_size + unit_size + 1 > max_size {
            chunks.push(Chunk::new(chunks.len(), current.join(" ")));
            current.clear();
            current_size = 0;
        }

        current_size += if current.is_empty() { unit_size } else { unit_size + 1 };
        current.push(unit);
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(chunks.len(), current.join(" ")));
    }

    chunks
}
