//! Storage abstraction for embedded chunks.
//!
//! The [`VectorStore`] trait is the one contract every backend satisfies
//! (in-memory, the on-disk local index, MongoDB Atlas Vector Search), so
//! callers never branch on the backend.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{EmbeddedChunk, RetrievedChunk};

/// Abstract vector storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorStore::upsert) | Insert new chunks, replace chunks whose id already exists |
/// | [`similarity_search`](VectorStore::similarity_search) | Top-k chunks by descending similarity |
/// | [`count`](VectorStore::count) | Number of stored chunks |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend label for logs (e.g. `"local"`).
    fn backend_name(&self) -> &str;

    /// Store chunks with their embeddings, keyed by chunk id.
    ///
    /// Idempotent: upserting the same set twice leaves the store unchanged.
    async fn upsert(&self, records: &[EmbeddedChunk]) -> Result<()>;

    /// Return at most `k` chunks ranked by descending similarity to
    /// `query`. An empty store yields an empty result, not an error.
    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Number of chunks currently stored.
    async fn count(&self) -> Result<usize>;
}
