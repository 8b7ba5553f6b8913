//! Overlapping-window text splitter.
//!
//! Splits each [`Document`] into [`Chunk`]s of at most `chunk_size`
//! characters, with up to `chunk_overlap` characters shared between
//! consecutive chunks. Chunks are exact substrings of the document, so the
//! original text can always be rebuilt from the chunks and their
//! `start_index` offsets.
//!
//! Each chunk receives a deterministic ID derived from its content, source,
//! and page (see [`chunk_id`]), which lets re-ingestion overwrite instead of
//! duplicate.
//!
//! # Algorithm
//!
//! Lengths are counted in characters. While more than `chunk_size`
//! characters remain after the current start:
//!
//! 1. Let `hard_end = start + chunk_size`.
//! 2. Search the back half of the window, `(start + overlap, hard_end]`
//!    (and never before `start + chunk_size / 2`), for the last breakpoint,
//!    trying in order: a blank line (`\n\n`), a newline, a sentence end
//!    (`.`, `!` or `?` followed by whitespace), any whitespace. The chunk
//!    ends just after the breakpoint.
//! 3. If no breakpoint exists, cut hard at `hard_end`.
//! 4. The next chunk starts at the first word start inside the last
//!    `chunk_overlap` characters of the chunk just emitted, or exactly
//!    `chunk_overlap` characters back when that region has no word start.
//!
//! The remainder becomes the final chunk. A document of `chunk_size`
//! characters or fewer (including an empty one) yields exactly one chunk
//! equal to the whole document.
//!
//! # Example
//!
//! ```rust
//! use ragfile_core::chunk::{split_documents, SplitParams};
//! use ragfile_core::models::Document;
//!
//! let docs = vec![Document::new("The quick brown fox.", "fox.txt", None)];
//! let chunks = split_documents(&docs, SplitParams::default());
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].content, "The quick brown fox.");
//! ```

use sha2::{Digest, Sha256};

use crate::error::{RagError, Result};
use crate::models::{Chunk, Document};

pub const DEFAULT_CHUNK_SIZE: usize = 900;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// Validated window parameters: `chunk_size > 0` and
/// `chunk_overlap < chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitParams {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SplitParams {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunking.chunk_size must be > 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split documents into chunks, in document order then position order.
pub fn split_documents(docs: &[Document], params: SplitParams) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|doc| split_document(doc, params))
        .collect()
}

/// Split a single document. Every chunk inherits `source` and `page`.
pub fn split_document(doc: &Document, params: SplitParams) -> Vec<Chunk> {
    split_text(&doc.content, params)
        .into_iter()
        .map(|(start_index, piece)| Chunk {
            id: chunk_id(piece, &doc.source, doc.page),
            content: piece.to_string(),
            source: doc.source.clone(),
            page: doc.page,
            start_index,
        })
        .collect()
}

/// Split raw text into `(char offset, substring)` windows.
pub fn split_text(text: &str, params: SplitParams) -> Vec<(usize, &str)> {
    let chars: Vec<char> = text.chars().collect();
    let mut byte_at: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    byte_at.push(text.len());

    split_spans(&chars, params)
        .into_iter()
        .map(|(start, end)| (start, &text[byte_at[start]..byte_at[end]]))
        .collect()
}

/// Stable identifier for a chunk: SHA-256 over the length-prefixed content
/// and source plus the page, hex encoded.
///
/// Length prefixes keep field boundaries unambiguous, so `("a|b", "c")` and
/// `("a", "b|c")` hash differently.
pub fn chunk_id(content: &str, source: &str, page: Option<u32>) -> String {
    let mut hasher = Sha256::new();
    for field in [content.as_bytes(), source.as_bytes()] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    match page {
        Some(p) => {
            hasher.update([1u8]);
            hasher.update(p.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
    format!("{:x}", hasher.finalize())
}

fn split_spans(chars: &[char], params: SplitParams) -> Vec<(usize, usize)> {
    let n = chars.len();
    let size = params.chunk_size;
    let overlap = params.chunk_overlap;

    let mut spans = Vec::new();
    let mut start = 0;

    while n - start > size {
        let hard_end = start + size;
        let lo = (start + overlap + 1).max(start + size / 2);
        let end = find_breakpoint(chars, lo, hard_end).unwrap_or(hard_end);
        spans.push((start, end));
        // end > start + overlap, so the next start always advances.
        start = overlap_start(chars, end - overlap, end);
    }

    spans.push((start, n));
    spans
}

type BreakRule = fn(&[char], usize) -> bool;

/// Breakpoint kinds, most preferred first.
const BREAK_RULES: [BreakRule; 4] = [is_paragraph_end, is_line_end, is_sentence_end, is_word_end];

/// Last exclusive end in `[lo, hi]` matching the strongest available rule.
fn find_breakpoint(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    BREAK_RULES
        .iter()
        .find_map(|rule| (lo..=hi).rev().find(|&end| rule(chars, end)))
}

fn is_paragraph_end(chars: &[char], end: usize) -> bool {
    end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n'
}

fn is_line_end(chars: &[char], end: usize) -> bool {
    end >= 1 && chars[end - 1] == '\n'
}

fn is_sentence_end(chars: &[char], end: usize) -> bool {
    end >= 2 && chars[end - 1].is_whitespace() && matches!(chars[end - 2], '.' | '!' | '?')
}

fn is_word_end(chars: &[char], end: usize) -> bool {
    end >= 1 && chars[end - 1].is_whitespace()
}

/// First word start in `[from, end)`, or `from` for a hard overlap cut.
fn overlap_start(chars: &[char], from: usize, end: usize) -> usize {
    (from..end)
        .find(|&p| p > 0 && chars[p - 1].is_whitespace() && !chars[p].is_whitespace())
        .unwrap_or(from)
}
