//! MongoDB Atlas Vector Search (the REMOTE backend).
//!
//! Each chunk is one document in the configured collection:
//!
//! ```json
//! { "_id": "<chunk id>", "text": "…", "embedding": [0.1, …],
//!   "source": "a.pdf", "page": 1, "start_index": 0 }
//! ```
//!
//! The text and embedding field names come from `mongodb.text_key` and
//! `mongodb.embedding_key`. Search runs a `$vectorSearch` aggregation
//! against `mongodb.index_name`, which must already exist in Atlas and
//! index the embedding field with cosine similarity.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document as BsonDocument};
use mongodb::{Client, Collection};
use ragfile_core::models::{Chunk, EmbeddedChunk, RetrievedChunk};
use ragfile_core::store::VectorStore;
use ragfile_core::{RagError, Result};
use tracing::debug;

use crate::config::MongoConfig;

pub struct MongoStore {
    collection: Collection<BsonDocument>,
    index_name: String,
    text_key: String,
    embedding_key: String,
}

fn unavailable(context: &str, e: mongodb::error::Error) -> RagError {
    RagError::BackendUnavailable(format!("MongoDB {}: {}", context, e))
}

impl MongoStore {
    /// Connect and verify the server answers a `ping`.
    ///
    /// The search index itself is not checked here.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let uri = config
            .uri
            .as_deref()
            .ok_or_else(|| RagError::Configuration("MONGODB_URI is not set".to_string()))?;
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| unavailable("connect", e))?;
        let db = client.database(&config.database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| unavailable("ping", e))?;
        debug!(
            database = %config.database,
            collection = %config.collection,
            "connected to MongoDB"
        );
        Ok(Self {
            collection: db.collection(&config.collection),
            index_name: config.index_name.clone(),
            text_key: config.text_key.clone(),
            embedding_key: config.embedding_key.clone(),
        })
    }

    fn to_document(&self, record: &EmbeddedChunk) -> BsonDocument {
        record_to_document(record, &self.text_key, &self.embedding_key)
    }
}

fn record_to_document(record: &EmbeddedChunk, text_key: &str, embedding_key: &str) -> BsonDocument {
    let chunk = &record.chunk;
    let mut d = BsonDocument::new();
    d.insert("_id", chunk.id.as_str());
    d.insert(text_key, chunk.content.as_str());
    d.insert(
        embedding_key,
        Bson::Array(
            record
                .embedding
                .iter()
                .map(|x| Bson::Double(f64::from(*x)))
                .collect(),
        ),
    );
    d.insert("source", chunk.source.as_str());
    d.insert(
        "page",
        chunk.page.map_or(Bson::Null, |p| Bson::Int64(i64::from(p))),
    );
    d.insert("start_index", chunk.start_index as i64);
    d
}

fn as_u64(value: Option<&Bson>) -> Option<u64> {
    match value? {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        Bson::Double(v) if *v >= 0.0 => Some(*v as u64),
        _ => None,
    }
}

fn chunk_from_document(d: &BsonDocument, text_key: &str) -> Result<(Chunk, f32)> {
    let id = d
        .get_str("_id")
        .map_err(|_| RagError::Provider("MongoDB result without a string _id".to_string()))?
        .to_string();
    let content = d
        .get_str(text_key)
        .map_err(|_| {
            RagError::Provider(format!("MongoDB result {} has no '{}' field", id, text_key))
        })?
        .to_string();
    let source = d.get_str("source").unwrap_or_default().to_string();
    let page = as_u64(d.get("page")).and_then(|p| u32::try_from(p).ok());
    let start_index = as_u64(d.get("start_index")).unwrap_or(0) as usize;
    let score = d.get_f64("score").unwrap_or(0.0) as f32;
    Ok((
        Chunk {
            id,
            content,
            source,
            page,
            start_index,
        },
        score,
    ))
}

/// `$vectorSearch` + score projection for the top `k` hits.
fn search_pipeline(
    index_name: &str,
    embedding_key: &str,
    query: &[f32],
    k: usize,
) -> Vec<BsonDocument> {
    let query_vector: Vec<Bson> = query.iter().map(|x| Bson::Double(f64::from(*x))).collect();
    let num_candidates = (k * 10).max(100) as i64;
    let mut exclude = BsonDocument::new();
    exclude.insert(embedding_key, 0);
    vec![
        doc! {
            "$vectorSearch": {
                "index": index_name,
                "path": embedding_key,
                "queryVector": query_vector,
                "numCandidates": num_candidates,
                "limit": k as i64,
            }
        },
        doc! { "$set": { "score": { "$meta": "vectorSearchScore" } } },
        doc! { "$project": exclude },
    ]
}

#[async_trait]
impl VectorStore for MongoStore {
    fn backend_name(&self) -> &str {
        "mongodb"
    }

    async fn upsert(&self, records: &[EmbeddedChunk]) -> Result<()> {
        for record in records {
            self.collection
                .replace_one(doc! { "_id": record.chunk.id.as_str() }, self.to_document(record))
                .upsert(true)
                .await
                .map_err(|e| unavailable("upsert", e))?;
        }
        Ok(())
    }

    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let pipeline = search_pipeline(&self.index_name, &self.embedding_key, query, k);
        let docs: Vec<BsonDocument> = self
            .collection
            .aggregate(pipeline)
            .await
            .map_err(|e| unavailable("vector search", e))?
            .try_collect()
            .await
            .map_err(|e| unavailable("vector search", e))?;

        docs.iter()
            .take(k)
            .enumerate()
            .map(|(rank, d)| {
                let (chunk, score) = chunk_from_document(d, &self.text_key)?;
                Ok(RetrievedChunk { chunk, rank, score })
            })
            .collect()
    }

    async fn count(&self) -> Result<usize> {
        let n = self
            .collection
            .count_documents(doc! {})
            .await
            .map_err(|e| unavailable("count", e))?;
        Ok(n as usize)
    }
}
