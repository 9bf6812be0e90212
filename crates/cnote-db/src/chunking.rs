//! Sliding-window text chunking for embedding generation.
//!
//! Notes are split into overlapping fixed-size windows so every boundary
//! region appears in two chunks. Window cuts prefer word boundaries, but
//! never back up further than half a window to avoid sacrificing too much
//! text to alignment.

use cnote_core::defaults;

/// Configuration for the sliding-window chunker.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum size of a chunk in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::CHUNK_SIZE,
            overlap: defaults::CHUNK_OVERLAP,
        }
    }
}

/// A text chunk with its position index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    /// 0-based, contiguous, order-significant.
    pub index: usize,
}

/// Collapse whitespace runs to single spaces and trim the ends.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Combine note title and content into the text that gets chunked.
pub fn prepare_note_text(title: &str, content: &str) -> String {
    format!("{}\n\n{}", title, content)
}

/// Split text into overlapping chunks using the default configuration.
pub fn chunk_text(text: &str) -> Vec<TextChunk> {
    chunk_text_with(text, &ChunkerConfig::default())
}

/// Split text into overlapping chunks.
///
/// Whitespace is normalized before measuring. Text at most one window
/// long becomes a single chunk; empty text yields no chunks. Windows are
/// cut at the last space within the window when the natural cut point
/// falls mid-word, unless that space lies in the first half of the
/// window. The final window always extends to end-of-text.
///
/// Indices are char offsets, not bytes, so multi-byte text never splits
/// a code point.
pub fn chunk_text_with(text: &str, config: &ChunkerConfig) -> Vec<TextChunk> {
    let clean = normalize_whitespace(text);
    if clean.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = clean.chars().collect();
    let len = chars.len();

    if len <= config.chunk_size {
        return vec![TextChunk {
            text: clean,
            index: 0,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    while start < len {
        let mut end = (start + config.chunk_size).min(len);

        if end < len {
            // Back up to a word boundary, but not past the window midpoint.
            if let Some(space_pos) = last_space_at_or_before(&chars, end) {
                if space_pos > start + config.chunk_size / 2 {
                    end = space_pos;
                }
            }
        }

        if end > start {
            chunks.push(TextChunk {
                text: chars[start..end].iter().collect(),
                index,
            });
            index += 1;
        }

        if end >= len {
            break;
        }

        // Overlap the next window with the tail of this one. The guard
        // keeps degenerate configs (overlap >= chunk_size) terminating.
        let next_start = end.saturating_sub(config.overlap);
        if next_start <= start {
            break;
        }
        start = next_start;
    }

    chunks
}

/// Position of the last space at or before `pos` (char index).
fn last_space_at_or_before(chars: &[char], pos: usize) -> Option<usize> {
    let upper = pos.min(chars.len().saturating_sub(1));
    (0..=upper).rev().find(|&i| chars[i] == ' ')
}
