//! Ingestion: load → split → embed → store.
//!
//! Chunks are embedded in batches of `embedding.batch_size` and each batch
//! is upserted as soon as its vectors arrive. Ingestion is not
//! transactional: if a later batch fails, earlier batches stay stored and
//! the error is returned unchanged.
//!
//! Chunks whose content is blank are not embedded or stored.

use std::path::Path;

use ragfile_core::chunk::split_documents;
use ragfile_core::embedding::Embedder;
use ragfile_core::models::{Chunk, Document, EmbeddedChunk};
use ragfile_core::store::VectorStore;
use ragfile_core::{RagError, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::embedding::make_embedder;
use crate::loader;
use crate::store::open_store_for_ingest;

/// Ingest the PDF or text file at `path`. Returns the number of chunks
/// stored.
pub async fn ingest(config: &Config, path: &Path) -> Result<usize> {
    let docs = loader::load(path)?;
    ingest_documents(config, &docs).await
}

/// Ingest an uploaded file from its name and raw bytes.
pub async fn ingest_bytes(config: &Config, name: &str, bytes: &[u8]) -> Result<usize> {
    let docs = loader::load_bytes(name, bytes)?;
    ingest_documents(config, &docs).await
}

/// Ingest already-decoded text under the source name `name`.
pub async fn ingest_text(config: &Config, name: &str, text: &str) -> Result<usize> {
    let docs = loader::load_text(name, text);
    ingest_documents(config, &docs).await
}

async fn ingest_documents(config: &Config, docs: &[Document]) -> Result<usize> {
    let chunks = split(config, docs)?;
    info!(
        documents = docs.len(),
        chunks = chunks.len(),
        "split documents"
    );
    embed_and_store(config, &chunks).await
}

/// Split documents with the configured chunk size and overlap.
pub fn split(config: &Config, docs: &[Document]) -> Result<Vec<Chunk>> {
    Ok(split_documents(docs, config.chunking.split_params()?))
}

/// Embed `chunks` with the configured embedder and upsert them into the
/// configured store. Returns the number of chunks stored.
pub async fn embed_and_store(config: &Config, chunks: &[Chunk]) -> Result<usize> {
    let embedder = make_embedder(config)?;
    let store = open_store_for_ingest(config, embedder.model_name()).await?;
    embed_and_store_with(
        embedder.as_ref(),
        store.as_ref(),
        chunks,
        config.embedding.batch_size,
    )
    .await
}

/// Embed and upsert `chunks` batch by batch.
pub async fn embed_and_store_with(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    chunks: &[Chunk],
    batch_size: usize,
) -> Result<usize> {
    if batch_size == 0 {
        return Err(RagError::Configuration(
            "embedding.batch_size must be > 0".to_string(),
        ));
    }

    let (kept, blank): (Vec<&Chunk>, Vec<&Chunk>) =
        chunks.iter().partition(|c| !c.content.trim().is_empty());
    if !blank.is_empty() {
        debug!(skipped = blank.len(), "skipping blank chunks");
    }

    let total_batches = kept.len().div_ceil(batch_size);
    let mut stored = 0;
    for (i, batch) in kept.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed_documents(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(RagError::Provider(format!(
                "embedder {} returned {} vectors for {} texts",
                embedder.model_name(),
                vectors.len(),
                batch.len()
            )));
        }

        let records: Vec<EmbeddedChunk> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, embedding)| EmbeddedChunk {
                chunk: (*chunk).clone(),
                embedding,
            })
            .collect();
        store.upsert(&records).await?;
        stored += records.len();
        debug!(
            batch = i + 1,
            of = total_batches,
            stored,
            backend = store.backend_name(),
            "stored batch"
        );
    }

    info!(
        stored,
        model = embedder.model_name(),
        backend = store.backend_name(),
        "ingestion complete"
    );
    Ok(stored)
}
