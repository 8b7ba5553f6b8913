//! Embedding providers.
//!
//! Two [`Embedder`] implementations, selected by `embedding.provider`:
//!
//! | Config Value | Provider |
//! |-------------|----------|
//! | `HF` | [`HuggingFaceEmbedder`]: local sentence-transformers model via fastembed (feature `local-embeddings`) |
//! | `OPENAI` | [`OpenAiEmbedder`]: `POST {base_url}/embeddings`, batched, with retry/backoff |
//!
//! Use [`make_embedder`] to build the configured provider.

use async_trait::async_trait;
use ragfile_core::embedding::Embedder;
use ragfile_core::{RagError, Result};
use serde_json::Value;

use crate::config::Config;
use crate::http::{build_client, post_json, JsonRequest};

/// Recognised values of `embedding.provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    HuggingFace,
    OpenAi,
}

impl EmbeddingProvider {
    /// Parse a provider selector, case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "HF" | "HUGGINGFACE" => Ok(Self::HuggingFace),
            "OPENAI" => Ok(Self::OpenAi),
            _ => Err(RagError::UnsupportedProvider(format!(
                "embedding provider '{}'. Must be HF or OPENAI.",
                name
            ))),
        }
    }
}

/// Build the embedder selected by `config`.
///
/// # Errors
///
/// - [`RagError::UnsupportedProvider`] for an unknown provider name.
/// - [`RagError::DependencyUnavailable`] for `HF` when built without the
///   `local-embeddings` feature.
/// - [`RagError::Configuration`] for `OPENAI` without an API key, or an
///   unknown local model name.
pub fn make_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    match EmbeddingProvider::parse(&config.embedding.provider)? {
        EmbeddingProvider::OpenAi => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::HuggingFace => Ok(Box::new(HuggingFaceEmbedder::new(
            &config.embedding.hf_model,
        )?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::HuggingFace => Err(RagError::DependencyUnavailable(
            "HF embeddings require building with --features local-embeddings".to_string(),
        )),
    }
}

// ============ OpenAI ============

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    model: String,
    url: String,
    api_key: String,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.openai.api_key.clone().ok_or_else(|| {
            RagError::Configuration("OPENAI_API_KEY is required for EMBEDDINGS=OPENAI".to_string())
        })?;
        Ok(Self {
            client: build_client(config.embedding.timeout_secs)?,
            model: config.embedding.openai_model.clone(),
            url: format!("{}/embeddings", config.openai.base_url.trim_end_matches('/')),
            api_key,
            max_retries: config.embedding.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_json(
            &self.client,
            JsonRequest {
                provider: "OpenAI",
                url: &self.url,
                bearer: Some(&self.api_key),
                body: &body,
                max_retries: self.max_retries,
            },
        )
        .await?;
        let vectors = parse_openai_response(&json)?;
        if vectors.len() != texts.len() {
            return Err(RagError::Provider(format!(
                "OpenAI returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| RagError::Provider("invalid OpenAI response: missing data array".into()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| RagError::Provider("invalid OpenAI response: missing embedding".into()))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map_or(position, |i| i as usize);
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Local (fastembed) ============

/// Embeddings from a local sentence-transformers model.
///
/// The model is downloaded from Hugging Face on first use and cached by
/// fastembed; after that no network calls are made. Loading happens lazily
/// on the first embed call, on a blocking thread.
#[cfg(feature = "local-embeddings")]
pub struct HuggingFaceEmbedder {
    model_name: String,
    model: fastembed::EmbeddingModel,
    engine: std::sync::Arc<std::sync::Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings")]
impl HuggingFaceEmbedder {
    pub fn new(model_name: &str) -> Result<Self> {
        Ok(Self {
            model_name: model_name.to_string(),
            model: to_fastembed_model(model_name)?,
            engine: Default::default(),
        })
    }
}

/// Map a Hugging Face model id (or its short name) to a fastembed model.
#[cfg(feature = "local-embeddings")]
fn to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    let short = name.rsplit('/').next().unwrap_or(name).to_ascii_lowercase();
    match short.as_str() {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "paraphrase-multilingual-minilm-l12-v2" => {
            Ok(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2)
        }
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        _ => Err(RagError::Configuration(format!(
            "unknown local embedding model: '{}'. Supported models: \
             sentence-transformers/all-MiniLM-L6-v2, sentence-transformers/all-MiniLM-L12-v2, \
             BAAI/bge-small-en-v1.5, BAAI/bge-base-en-v1.5, BAAI/bge-large-en-v1.5, \
             sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2, \
             intfloat/multilingual-e5-small, intfloat/multilingual-e5-base",
            name
        ))),
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let engine = self.engine.clone();
        let model = self.model.clone();
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = engine
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if guard.is_none() {
                let loaded = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(model).with_show_download_progress(false),
                )
                .map_err(|e| {
                    RagError::DependencyUnavailable(format!(
                        "failed to initialize local embedding model: {}",
                        e
                    ))
                })?;
                *guard = Some(loaded);
            }
            let Some(engine) = guard.as_mut() else {
                return Err(RagError::Provider("local embedding model not loaded".into()));
            };
            engine
                .embed(texts, None)
                .map_err(|e| RagError::Provider(format!("local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| RagError::Provider(format!("local embedding task failed: {}", e)))?
    }
}
