//! Sentence-aligned text chunking.
//!
//! Sentences end at `.`, `!` or `?` followed by whitespace.  Sentences are
//! packed greedily into chunks of at most `max_chars` characters (joined by
//! a single space); a sentence is never split, so one sentence longer than
//! the budget becomes its own oversized chunk.
//!
//! ```
//! use voice_narrator::text::chunk_text;
//!
//! let chunks = chunk_text("Hello world. This is a test.", 240);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].index, 1);
//! assert_eq!(chunks[0].text, "Hello world. This is a test.");
//! ```

use std::sync::OnceLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One bounded text segment.  `index` is 1-based and equals synthesis order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

// ---------------------------------------------------------------------------
// Sentence splitting
// ---------------------------------------------------------------------------

fn sentence_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence break pattern is valid"))
}

/// Split `text` into trimmed, non-empty sentences in original order.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in sentence_break().find_iter(text) {
        // The terminal mark is ASCII, so it is exactly one byte.
        let end = m.start() + 1;
        push_trimmed(&mut sentences, &text[start..end]);
        start = m.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, s: &'a str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s);
    }
}

// ---------------------------------------------------------------------------
// chunk_text
// ---------------------------------------------------------------------------

/// Greedily pack the sentences of `text` into chunks of at most `max_chars`
/// characters.
///
/// Empty or whitespace-only input yields an empty list.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let len = sentence.chars().count();

        if current.is_empty() {
            current.push_str(sentence);
            current_len = len;
        } else if current_len + 1 + len <= max_chars {
            current.push(' ');
            current.push_str(sentence);
            current_len += 1 + len;
        } else {
            let index = chunks.len() + 1;
            chunks.push(Chunk::new(index, std::mem::take(&mut current)));
            current.push_str(sentence);
            current_len = len;
        }
    }

    if !current.is_empty() {
        let index = chunks.len() + 1;
        chunks.push(Chunk::new(index, current));
    }

    chunks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
