//! Retrieval-augmented answering over the capability traits.
//!
//! [`answer_with`] is the provider-agnostic core: it never resolves
//! configuration or constructs backends, so any [`Embedder`],
//! [`VectorStore`], and [`Generator`] can be plugged in.
//!
//! # Steps
//!
//! 1. Resolve the prompt template (fails before any provider call).
//! 2. Embed the question.
//! 3. Retrieve the top-`k` chunks.
//! 4. If nothing was retrieved, answer with the template's refusal phrase
//!    without invoking the model.
//! 5. Otherwise format the chunks into a cited context, render the
//!    template, and invoke the model once.
//! 6. Attach a truncated preview of every retrieved chunk.

use tracing::debug;

use crate::embedding::Embedder;
use crate::error::Result;
use crate::llm::Generator;
use crate::models::{AnswerRecord, Chunk, RetrievedChunk, SourcePreview};
use crate::prompt::{format_context, get_prompt};
use crate::store::VectorStore;
use crate::text::{truncate, PREVIEW_CHARS};

/// Number of chunks retrieved when the caller does not choose.
pub const DEFAULT_K: usize = 4;

/// Answer `question` from the chunks in `store`.
///
/// # Errors
///
/// - [`RagError::UnknownPrompt`](crate::RagError::UnknownPrompt) if
///   `prompt_name` is not registered; no provider is called.
/// - Any error raised by the embedder, store, or generator, unchanged.
pub async fn answer_with(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    generator: &dyn Generator,
    question: &str,
    k: usize,
    prompt_name: &str,
) -> Result<AnswerRecord> {
    let template = get_prompt(prompt_name)?;

    let query = embedder.embed_query(question).await?;
    let retrieved = store.similarity_search(&query, k).await?;
    debug!(
        backend = store.backend_name(),
        k,
        hits = retrieved.len(),
        "retrieved context"
    );

    if retrieved.is_empty() {
        return Ok(AnswerRecord {
            answer: template.refusal.to_string(),
            sources: Vec::new(),
        });
    }

    let chunks: Vec<Chunk> = retrieved.iter().map(|r| r.chunk.clone()).collect();
    let context = format_context(&chunks);
    let prompt = template.render(question, &context);
    let answer = generator.generate(&prompt).await?;

    Ok(AnswerRecord {
        answer,
        sources: build_sources(&retrieved),
    })
}

/// Citation previews for retrieved chunks, in rank order.
pub fn build_sources(retrieved: &[RetrievedChunk]) -> Vec<SourcePreview> {
    retrieved
        .iter()
        .map(|r| SourcePreview {
            chunk_id: r.chunk.id.clone(),
            source: r.chunk.source.clone(),
            page: r.chunk.page,
            preview: truncate(&r.chunk.content, PREVIEW_CHARS),
        })
        .collect()
}
