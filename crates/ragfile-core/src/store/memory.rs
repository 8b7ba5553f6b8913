//! In-memory [`VectorStore`] implementation.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`, kept in insertion
//! order with an id → position map. Search is brute-force cosine similarity
//! with a stable sort, so equal scores keep insertion order.
//!
//! The on-disk local index in the app crate wraps this store and persists
//! its [`entries`](InMemoryStore::entries) snapshot.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::models::{EmbeddedChunk, RetrievedChunk};

use super::VectorStore;

#[derive(Default)]
struct Entries {
    records: Vec<EmbeddedChunk>,
    position: HashMap<String, usize>,
}

impl Entries {
    fn upsert(&mut self, record: EmbeddedChunk) {
        match self.position.get(&record.chunk.id) {
            Some(&i) => self.records[i] = record,
            None => {
                self.position
                    .insert(record.chunk.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

/// In-memory store for tests and as the engine behind the local index.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<Entries>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously saved entries, in order.
    pub fn from_entries(records: Vec<EmbeddedChunk>) -> Self {
        let mut entries = Entries::default();
        for r in records {
            entries.upsert(r);
        }
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<EmbeddedChunk> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Synchronous form of [`VectorStore::upsert`].
    pub fn insert(&self, records: &[EmbeddedChunk]) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for r in records {
            entries.upsert(r.clone());
        }
    }

    /// Synchronous form of [`VectorStore::similarity_search`].
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RetrievedChunk> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut scored: Vec<(f32, &EmbeddedChunk)> = entries
            .records
            .iter()
            .map(|r| (cosine_similarity(query, &r.embedding), r))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, (score, r))| RetrievedChunk {
                chunk: r.chunk.clone(),
                rank,
                score,
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, records: &[EmbeddedChunk]) -> Result<()> {
        self.insert(records);
        Ok(())
    }

    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        Ok(self.search(query, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.len())
    }
}
