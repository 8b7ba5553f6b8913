//! Vector store backends and backend selection.
//!
//! | Backend | Type | Notes |
//! |---------|------|-------|
//! | `LOCAL` | [`local::LocalIndex`] | Single JSON file under `store.local_dir` |
//! | `REMOTE` | [`remote::MongoStore`] | MongoDB Atlas collection + vector search index |

pub mod local;
pub mod remote;

use ragfile_core::store::VectorStore;
use ragfile_core::Result;
use tracing::info;

use crate::config::{Config, StoreBackend};
use local::LocalIndex;
use remote::MongoStore;

/// Open the configured store for answering.
///
/// # Errors
///
/// - [`RagError::NotFound`](ragfile_core::RagError::NotFound) for `LOCAL`
///   when no index has been written yet.
/// - [`RagError::BackendUnavailable`](ragfile_core::RagError::BackendUnavailable)
///   for `REMOTE` when the database cannot be reached.
pub async fn make_vector_store(config: &Config) -> Result<Box<dyn VectorStore>> {
    let backend = config.store_backend()?;
    info!(backend = backend.as_str(), "opening vector store");
    match backend {
        StoreBackend::Local => Ok(Box::new(LocalIndex::open(&config.store.local_dir)?)),
        StoreBackend::Remote => Ok(Box::new(MongoStore::connect(&config.mongodb).await?)),
    }
}

/// Open the configured store for ingestion, creating a `LOCAL` index if it
/// does not exist yet.
///
/// `model` is the embedding model whose vectors will be written.
pub async fn open_store_for_ingest(config: &Config, model: &str) -> Result<Box<dyn VectorStore>> {
    let backend = config.store_backend()?;
    info!(backend = backend.as_str(), "opening vector store for ingestion");
    match backend {
        StoreBackend::Local => Ok(Box::new(LocalIndex::open_or_create(
            &config.store.local_dir,
            model,
        )?)),
        StoreBackend::Remote => Ok(Box::new(MongoStore::connect(&config.mongodb).await?)),
    }
}
