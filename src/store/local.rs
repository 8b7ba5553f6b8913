//! On-disk vector index (the LOCAL backend).
//!
//! The whole index is one JSON file, `index.json`, inside the configured
//! directory:
//!
//! ```json
//! {
//!   "version": 1,
//!   "model": "sentence-transformers/all-MiniLM-L6-v2",
//!   "dims": 384,
//!   "updated_at": "2026-01-01T00:00:00+00:00",
//!   "entries": [
//!     { "id": "…", "content": "…", "source": "a.pdf", "page": 1,
//!       "start_index": 0, "vector": "<base64 little-endian f32>" }
//!   ]
//! }
//! ```
//!
//! Every [`upsert`](VectorStore::upsert) rewrites the file through a temp
//! file in the same directory followed by an atomic rename, so a crash
//! mid-write leaves the previous index intact. Search runs in memory.
//!
//! Concurrent writers in separate processes are not coordinated; the last
//! rename wins.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ragfile_core::embedding::{blob_to_vec, vec_to_blob};
use ragfile_core::models::{Chunk, EmbeddedChunk, RetrievedChunk};
use ragfile_core::store::memory::InMemoryStore;
use ragfile_core::store::VectorStore;
use ragfile_core::{RagError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// File name of the index inside its directory.
pub const INDEX_FILE: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    model: Option<String>,
    dims: Option<usize>,
    updated_at: String,
    entries: Vec<IndexEntry>,
}

#[derive(Serialize, Deserialize)]
struct IndexEntry {
    #[serde(flatten)]
    chunk: Chunk,
    vector: String,
}

#[derive(Debug, Clone, Default)]
struct IndexMeta {
    model: Option<String>,
    dims: Option<usize>,
}

/// A vector index persisted as a single JSON file.
pub struct LocalIndex {
    dir: PathBuf,
    entries: InMemoryStore,
    /// Held across snapshot + write so in-process saves never interleave.
    meta: Mutex<IndexMeta>,
}

impl LocalIndex {
    /// Open an existing index.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotFound`] if `dir` holds no index; ingestion must run
    ///   first.
    /// - [`RagError::CorruptIndex`] if the file cannot be decoded.
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        if !path.is_file() {
            return Err(RagError::NotFound(format!(
                "local index at {} (run ingestion first)",
                path.display()
            )));
        }
        let bytes = std::fs::read(&path)?;
        let file: IndexFile = serde_json::from_slice(&bytes)
            .map_err(|e| RagError::CorruptIndex(format!("{}: {}", path.display(), e)))?;
        if file.version != FORMAT_VERSION {
            return Err(RagError::CorruptIndex(format!(
                "{}: unsupported index version {}",
                path.display(),
                file.version
            )));
        }

        let mut records = Vec::with_capacity(file.entries.len());
        for entry in file.entries {
            let blob = BASE64.decode(entry.vector.as_bytes()).map_err(|e| {
                RagError::CorruptIndex(format!("vector for chunk {}: {}", entry.chunk.id, e))
            })?;
            if blob.len() % 4 != 0 {
                return Err(RagError::CorruptIndex(format!(
                    "vector for chunk {} has {} bytes",
                    entry.chunk.id,
                    blob.len()
                )));
            }
            let embedding = blob_to_vec(&blob);
            if file.dims.is_some_and(|d| d != embedding.len()) {
                return Err(RagError::CorruptIndex(format!(
                    "vector for chunk {} has {} dims, index declares {:?}",
                    entry.chunk.id,
                    embedding.len(),
                    file.dims
                )));
            }
            records.push(EmbeddedChunk {
                chunk: entry.chunk,
                embedding,
            });
        }

        debug!(dir = %dir.display(), entries = records.len(), "opened local index");
        Ok(Self {
            dir: dir.to_path_buf(),
            entries: InMemoryStore::from_entries(records),
            meta: Mutex::new(IndexMeta {
                model: file.model,
                dims: file.dims,
            }),
        })
    }

    /// Open the index in `dir`, or start an empty one if none exists.
    ///
    /// `model` is the embedding model about to write into the index. An
    /// existing non-empty index built with a different model is rejected
    /// with [`RagError::Configuration`].
    pub fn open_or_create(dir: &Path, model: &str) -> Result<Self> {
        let index = match Self::open(dir) {
            Ok(index) => index,
            Err(RagError::NotFound(_)) => {
                std::fs::create_dir_all(dir)?;
                Self {
                    dir: dir.to_path_buf(),
                    entries: InMemoryStore::new(),
                    meta: Mutex::new(IndexMeta::default()),
                }
            }
            Err(e) => return Err(e),
        };

        {
            let mut meta = index.meta.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = meta.model.as_deref() {
                if existing != model && !index.entries.is_empty() {
                    return Err(RagError::Configuration(format!(
                        "local index at {} was built with embedding model '{}', not '{}'; \
                         use a different LOCAL_INDEX_DIR or switch models back",
                        dir.display(),
                        existing,
                        model
                    )));
                }
            }
            meta.model = Some(model.to_string());
        }
        Ok(index)
    }

    /// Embedding model recorded in the index, if any.
    pub fn model(&self) -> Option<String> {
        self.lock_meta().model.clone()
    }

    /// Vector dimensionality recorded in the index, if any.
    pub fn dims(&self) -> Option<usize> {
        self.lock_meta().dims
    }

    fn lock_meta(&self) -> std::sync::MutexGuard<'_, IndexMeta> {
        self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the current entries to disk atomically.
    pub fn save(&self) -> Result<()> {
        let meta = self.lock_meta();
        self.write_file(&meta, self.entries.entries())
    }

    fn write_file(&self, meta: &IndexMeta, records: Vec<EmbeddedChunk>) -> Result<()> {
        let entries = records
            .into_iter()
            .map(|r| IndexEntry {
                vector: BASE64.encode(vec_to_blob(&r.embedding)),
                chunk: r.chunk,
            })
            .collect();
        let file = IndexFile {
            version: FORMAT_VERSION,
            model: meta.model.clone(),
            dims: meta.dims,
            updated_at: chrono::Utc::now().to_rfc3339(),
            entries,
        };

        std::fs::create_dir_all(&self.dir)?;
        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, &file)
                .map_err(|e| RagError::Io(std::io::Error::other(e)))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(self.dir.join(INDEX_FILE))
            .map_err(|e| RagError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalIndex {
    fn backend_name(&self) -> &str {
        "local"
    }

    async fn upsert(&self, records: &[EmbeddedChunk]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut meta = self.lock_meta();
        let expected = meta.dims.unwrap_or(records[0].embedding.len());
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
            return Err(RagError::Configuration(format!(
                "embedding for chunk {} has {} dims but the local index at {} holds {}-dim vectors; \
                 re-ingest into a fresh LOCAL_INDEX_DIR after changing embedding models",
                bad.chunk.id,
                bad.embedding.len(),
                self.dir.display(),
                expected
            )));
        }
        let staged_meta = IndexMeta {
            dims: Some(expected),
            ..meta.clone()
        };

        // Memory only changes once the merged snapshot is on disk.
        let staged = InMemoryStore::from_entries(self.entries.entries());
        staged.insert(records);
        self.write_file(&staged_meta, staged.entries())?;
        self.entries.insert(records);
        *meta = staged_meta;
        debug!(
            dir = %self.dir.display(),
            upserted = records.len(),
            total = self.entries.len(),
            "saved local index"
        );
        Ok(())
    }

    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if let Some(dims) = self.dims() {
            if dims != query.len() && !self.entries.is_empty() {
                warn!(
                    index_dims = dims,
                    query_dims = query.len(),
                    "query embedding does not match index"
                );
                return Err(RagError::Configuration(format!(
                    "query embedding has {} dims but the local index holds {}-dim vectors \
                     (built with model {:?})",
                    query.len(),
                    dims,
                    self.model()
                )));
            }
        }
        Ok(self.entries.search(query, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}
