//! Text preparation — sentence-aligned chunking and per-chunk planning.
//!
//! ```text
//! raw text ─▶ split_sentences ─▶ chunk_text (greedy, ≤ max_chars)
//!          ─▶ ChunkFilter::plan_all ─▶ [Synthesize | Skip] per chunk
//! ```

pub mod chunker;
pub mod prepare;

pub use chunker::{chunk_text, split_sentences, Chunk};
pub use prepare::{ensure_terminal_punctuation, ChunkFilter, ChunkPlan};
