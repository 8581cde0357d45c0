//! Recursive text chunker
//!
//! Splits documents into overlapping chunks for full-text indexing.
//! The splitter tries progressively finer separators (paragraph, line,
//! sentence, word) and falls back to a fixed character window when a
//! segment has no separator left. Adjacent chunks share a bounded
//! overlap so phrases spanning a boundary stay searchable.

use docforge_common::config::ChunkingConfig;
use std::collections::VecDeque;

/// Separators in decreasing order of structural significance
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// One chunk of a document with its 0-based position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub chunk_num: i32,
}

/// Split sanitized text into overlapping chunks.
///
/// Every produced chunk is at most `chunk_size` characters. Whitespace-only
/// fragments are dropped, so empty or blank input yields no chunks.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let splitter = Splitter::new(config.chunk_size, config.chunk_overlap);
    splitter
        .split(text, 0)
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .enumerate()
        .map(|(i, text)| TextChunk {
            text,
            chunk_num: i as i32,
        })
        .collect()
}

struct Splitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Splitter {
    fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        // Overlap must leave room for forward progress.
        let chunk_overlap = chunk_overlap.min(chunk_size - 1);
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Recursively split `text` using the separator at `depth`.
    fn split(&self, text: &str, depth: usize) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        let Some(sep) = SEPARATORS.get(depth) else {
            return self.hard_split(text);
        };
        if !text.contains(sep) {
            return self.split(text, depth + 1);
        }

        let segments: Vec<&str> = text.split(sep).collect();
        self.merge(&segments, sep, depth)
    }

    /// Greedily pack segments into chunks, carrying trailing segments
    /// forward as overlap when a chunk fills up.
    fn merge(&self, segments: &[&str], sep: &str, depth: usize) -> Vec<String> {
        let sep_len = char_len(sep);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &segment in segments {
            let seg_len = char_len(segment);

            // A single segment too large for one chunk gets split at the
            // next separator level. Overlap does not carry across it.
            if seg_len > self.chunk_size {
                if !window.is_empty() {
                    chunks.push(self.join(&window, sep));
                    window.clear();
                    total = 0;
                }
                chunks.extend(self.split(segment, depth + 1));
                continue;
            }

            // Emit the current window once adding this segment would
            // push the joined length past the chunk size.
            if !window.is_empty() && self.joined_len(total, window.len() + 1, sep_len) + seg_len > self.chunk_size {
                chunks.push(self.join(&window, sep));
                // Shrink from the front until the retained tail fits the
                // overlap budget and leaves room for the next segment.
                while !window.is_empty()
                    && (self.joined_len(total, window.len(), sep_len) > self.chunk_overlap
                        || self.joined_len(total, window.len() + 1, sep_len) + seg_len > self.chunk_size)
                {
                    let dropped = window.pop_front().unwrap_or_default();
                    total -= char_len(dropped);
                }
            }

            window.push_back(segment);
            total += seg_len;
        }

        if !window.is_empty() {
            chunks.push(self.join(&window, sep));
        }
        chunks
    }

    /// Length of the window joined with `count - 1` separators.
    fn joined_len(&self, total: usize, count: usize, sep_len: usize) -> usize {
        total + sep_len * count.saturating_sub(1)
    }

    fn join(&self, window: &VecDeque<&str>, sep: &str) -> String {
        window.iter().copied().collect::<Vec<_>>().join(sep)
    }

    /// Fixed character window for text with no usable separators.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let stride = (self.chunk_size - self.chunk_overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
