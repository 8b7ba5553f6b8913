//! Core data models that flow through ingestion and answering.
//!
//! Documents are produced by loaders, split into [`Chunk`]s, embedded into
//! [`EmbeddedChunk`]s for storage, and come back from similarity search as
//! [`RetrievedChunk`]s. An [`AnswerRecord`] is built per question and never
//! persisted.

use serde::{Deserialize, Serialize};

/// A loaded unit of source text: one PDF page or one whole text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    /// File name the text came from.
    pub source: String,
    /// 0-based page number for PDF input; `None` for plain text.
    pub page: Option<u32>,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            page,
        }
    }
}

/// A bounded span of a [`Document`], the unit of storage and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Content-derived identifier, see [`crate::chunk::chunk_id`].
    pub id: String,
    pub content: String,
    pub source: String,
    pub page: Option<u32>,
    /// Character offset of `content` within the parent document.
    pub start_index: usize,
}

/// A chunk paired with its embedding vector, ready for upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned from similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    /// 0-based position in the ranking (0 = most similar).
    pub rank: usize,
    /// Backend-reported similarity; higher is closer.
    pub score: f32,
}

/// Citation shown next to a generated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePreview {
    pub chunk_id: String,
    pub source: String,
    pub page: Option<u32>,
    /// Chunk content, truncated to [`crate::text::PREVIEW_CHARS`].
    pub preview: String,
}

/// The result of answering one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer: String,
    pub sources: Vec<SourcePreview>,
}
