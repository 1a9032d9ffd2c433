//! Per-chunk synthesis planning.
//!
//! [`ChunkFilter`] decides, for each [`Chunk`], whether it is sent to the
//! remote model or skipped.  Chunks shorter than `min_chars` after trimming
//! are degenerate input for the model and are skipped; every other chunk is
//! trimmed and given terminal punctuation.

use crate::text::chunker::Chunk;

/// Marks accepted as the end of a sentence.
const TERMINAL_MARKS: [char; 3] = ['.', '!', '?'];

// ---------------------------------------------------------------------------
// ChunkPlan
// ---------------------------------------------------------------------------

/// Decision for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPlan {
    /// Send `text` to the synthesis service.
    Synthesize { index: usize, text: String },
    /// Do not synthesize; the chunk is too short after trimming.
    Skip { index: usize, chars: usize },
}

impl ChunkPlan {
    pub fn index(&self) -> usize {
        match self {
            ChunkPlan::Synthesize { index, .. } | ChunkPlan::Skip { index, .. } => *index,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, ChunkPlan::Skip { .. })
    }
}

// ---------------------------------------------------------------------------
// ChunkFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ChunkFilter {
    pub min_chars: usize,
}

impl ChunkFilter {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    /// `true` when `text` is long enough to be worth synthesizing.
    pub fn is_meaningful(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.min_chars
    }

    pub fn plan(&self, chunk: &Chunk) -> ChunkPlan {
        let trimmed = chunk.text.trim();

        if !self.is_meaningful(trimmed) {
            let chars = trimmed.chars().count();
            log::warn!(
                "text: skipping chunk {} ({} chars < minimum {})",
                chunk.index,
                chars,
                self.min_chars
            );
            return ChunkPlan::Skip {
                index: chunk.index,
                chars,
            };
        }

        ChunkPlan::Synthesize {
            index: chunk.index,
            text: ensure_terminal_punctuation(trimmed),
        }
    }

    pub fn plan_all(&self, chunks: &[Chunk]) -> Vec<ChunkPlan> {
        chunks.iter().map(|c| self.plan(c)).collect()
    }
}

/// Append a period when `text` does not already end a sentence.
pub fn ensure_terminal_punctuation(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.ends_with(TERMINAL_MARKS) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
