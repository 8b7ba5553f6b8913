//! Configuration resolution.
//!
//! A [`Config`] snapshot is built from three layers, later layers winning:
//!
//! 1. Built-in defaults.
//! 2. An optional TOML file (`--config ragfile.toml`).
//! 3. Environment variables (`VECTORSTORE`, `LOCAL_INDEX_DIR`, `MONGODB_URI`,
//!    `EMBEDDINGS`, `LLM_PROVIDER`, `OPENAI_API_KEY`, and friends).
//!
//! The snapshot is validated once and then passed by reference into every
//! factory and pipeline call. Nothing below `main` reads the environment:
//! [`resolve_config_with`] takes the variable lookup as a parameter so tests
//! can resolve against a plain map.
//!
//! # Example
//!
//! ```toml
//! [store]
//! backend = "LOCAL"
//! local_dir = ".rag_index"
//!
//! [embedding]
//! provider = "OPENAI"
//! openai_model = "text-embedding-3-small"
//!
//! [llm]
//! provider = "OLLAMA"
//! ollama_model = "llama3.1"
//!
//! [chunking]
//! chunk_size = 900
//! chunk_overlap = 150
//! ```

use ragfile_core::chunk::{SplitParams, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use ragfile_core::prompt::DEFAULT_PROMPT;
use ragfile_core::{RagError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub mongodb: MongoConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub openai: OpenAiConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

/// Which vector store holds the chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Single-file index on local disk.
    Local,
    /// MongoDB Atlas collection with a vector search index.
    Remote,
}

impl StoreBackend {
    /// Parse a backend selector, case-insensitively.
    ///
    /// `LOCAL` and `FAISS` select [`StoreBackend::Local`]; `REMOTE`, `ATLAS`
    /// and `MONGODB` select [`StoreBackend::Remote`].
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "LOCAL" | "FAISS" => Ok(Self::Local),
            "REMOTE" | "ATLAS" | "MONGODB" => Ok(Self::Remote),
            _ => Err(RagError::UnsupportedProvider(format!(
                "vector store backend '{}'. Must be LOCAL or REMOTE.",
                name
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Remote => "REMOTE",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: String,
    pub local_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "LOCAL".to_string(),
            local_dir: PathBuf::from(".rag_index"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: Option<String>,
    pub database: String,
    pub collection: String,
    pub index_name: String,
    /// Document field holding the chunk text.
    pub text_key: String,
    /// Document field holding the embedding vector.
    pub embedding_key: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "rag_demo".to_string(),
            collection: "documents".to_string(),
            index_name: "vector_index".to_string(),
            text_key: "text".to_string(),
            embedding_key: "embedding".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `HF` (local sentence-transformers model) or `OPENAI`.
    pub provider: String,
    pub hf_model: String,
    pub openai_model: String,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "HF".to_string(),
            hf_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            openai_model: "text-embedding-3-small".to_string(),
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// `OPENAI` or `OLLAMA`.
    pub provider: String,
    pub openai_model: String,
    pub ollama_model: String,
    pub ollama_url: String,
    pub temperature: f32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "OPENAI".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            ollama_model: "llama3.1".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            temperature: 0.0,
            max_retries: 5,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn split_params(&self) -> Result<SplitParams> {
        SplitParams::new(self.chunk_size, self.chunk_overlap)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub k: usize,
    pub prompt: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: ragfile_core::answer::DEFAULT_K,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    /// The selected store backend.
    ///
    /// Always `Ok` for a snapshot returned by [`resolve_config_with`].
    pub fn store_backend(&self) -> Result<StoreBackend> {
        StoreBackend::parse(&self.store.backend)
    }
}

/// Resolve configuration from defaults, an optional file, and the process
/// environment.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    resolve_config_with(path, |key| std::env::var(key).ok())
}

/// Resolve configuration using `lookup` in place of the process environment.
///
/// Empty or whitespace-only values count as unset.
///
/// # Errors
///
/// - [`RagError::Configuration`] if the file cannot be read or parsed, or a
///   value fails validation.
/// - [`RagError::UnsupportedProvider`] if the store backend is not
///   recognised.
pub fn resolve_config_with<F>(path: Option<&Path>, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => Config::default(),
    };
    apply_env(&mut config, |key| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    });
    validate(&config)?;
    Ok(config)
}

fn load_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RagError::Configuration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    toml::from_str(&content).map_err(|e| {
        RagError::Configuration(format!(
            "failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })
}

fn apply_env<F>(config: &mut Config, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = var("VECTORSTORE") {
        config.store.backend = v;
    }
    if let Some(v) = var("LOCAL_INDEX_DIR").or_else(|| var("FAISS_INDEX_DIR")) {
        config.store.local_dir = PathBuf::from(v);
    }
    if let Some(v) = var("MONGODB_URI") {
        config.mongodb.uri = Some(v);
    }
    if let Some(v) = var("MONGODB_DB") {
        config.mongodb.database = v;
    }
    if let Some(v) = var("MONGODB_COLLECTION") {
        config.mongodb.collection = v;
    }
    if let Some(v) = var("MONGODB_ATLAS_INDEX_NAME") {
        config.mongodb.index_name = v;
    }
    if let Some(v) = var("EMBEDDINGS") {
        config.embedding.provider = v;
    }
    if let Some(v) = var("HF_EMBEDDINGS_MODEL") {
        config.embedding.hf_model = v;
    }
    if let Some(v) = var("OPENAI_EMBEDDINGS_MODEL") {
        config.embedding.openai_model = v;
    }
    if let Some(v) = var("LLM_PROVIDER") {
        config.llm.provider = v;
    }
    if let Some(v) = var("OPENAI_MODEL") {
        config.llm.openai_model = v;
    }
    if let Some(v) = var("OLLAMA_MODEL") {
        config.llm.ollama_model = v;
    }
    if let Some(v) = var("OLLAMA_URL") {
        config.llm.ollama_url = v;
    }
    if let Some(v) = var("OPENAI_API_KEY") {
        config.openai.api_key = Some(v);
    }
    if let Some(v) = var("OPENAI_BASE_URL") {
        config.openai.base_url = v;
    }
}

fn validate(config: &Config) -> Result<()> {
    let backend = config.store_backend()?;

    if backend == StoreBackend::Remote
        && config.mongodb.uri.as_deref().map_or(true, str::is_empty)
    {
        return Err(RagError::Configuration(
            "MONGODB_URI is required when VECTORSTORE=REMOTE".to_string(),
        ));
    }

    config.chunking.split_params()?;

    if config.retrieval.k == 0 {
        return Err(RagError::Configuration(
            "retrieval.k must be >= 1".to_string(),
        ));
    }

    if config.embedding.batch_size == 0 {
        return Err(RagError::Configuration(
            "embedding.batch_size must be > 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("ragfile.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = resolve_config_with(None, env(&[])).unwrap();
        assert_eq!(config.store_backend().unwrap(), StoreBackend::Local);
        assert_eq!(config.store.local_dir, PathBuf::from(".rag_index"));
        assert_eq!(config.mongodb.database, "rag_demo");
        assert_eq!(config.mongodb.collection, "documents");
        assert_eq!(config.mongodb.index_name, "vector_index");
        assert_eq!(config.mongodb.text_key, "text");
        assert_eq!(config.mongodb.embedding_key, "embedding");
        assert_eq!(config.embedding.provider, "HF");
        assert_eq!(
            config.embedding.hf_model,
            "sentence-transformers/all-MiniLM-L6-v2"
        );
        assert_eq!(config.llm.provider, "OPENAI");
        assert_eq!(config.llm.openai_model, "gpt-4o-mini");
        assert_eq!(config.chunking.chunk_size, 900);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.retrieval.k, 4);
        assert_eq!(config.retrieval.prompt, "default");
        assert!(config.openai.api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = resolve_config_with(
            None,
            env(&[
                ("VECTORSTORE", "atlas"),
                ("MONGODB_URI", "mongodb://localhost:27017"),
                ("MONGODB_DB", "docs"),
                ("EMBEDDINGS", "OPENAI"),
                ("LLM_PROVIDER", "OLLAMA"),
                ("OLLAMA_MODEL", "mistral"),
                ("OPENAI_API_KEY", "sk-test"),
            ]),
        )
        .unwrap();
        assert_eq!(config.store_backend().unwrap(), StoreBackend::Remote);
        assert_eq!(config.mongodb.database, "docs");
        assert_eq!(config.embedding.provider, "OPENAI");
        assert_eq!(config.llm.provider, "OLLAMA");
        assert_eq!(config.llm.ollama_model, "mistral");
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_legacy_index_dir_alias() {
        let config =
            resolve_config_with(None, env(&[("FAISS_INDEX_DIR", "/tmp/legacy")])).unwrap();
        assert_eq!(config.store.local_dir, PathBuf::from("/tmp/legacy"));

        let config = resolve_config_with(
            None,
            env(&[
                ("FAISS_INDEX_DIR", "/tmp/legacy"),
                ("LOCAL_INDEX_DIR", "/tmp/new"),
            ]),
        )
        .unwrap();
        assert_eq!(config.store.local_dir, PathBuf::from("/tmp/new"));
    }

    #[test]
    fn test_empty_env_value_is_unset() {
        let config = resolve_config_with(None, env(&[("VECTORSTORE", "  ")])).unwrap();
        assert_eq!(config.store_backend().unwrap(), StoreBackend::Local);
    }

    #[test]
    fn test_remote_requires_uri() {
        let err = resolve_config_with(None, env(&[("VECTORSTORE", "REMOTE")])).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        assert!(err.to_string().contains("MONGODB_URI"));
    }

    #[test]
    fn test_unknown_backend() {
        let err = resolve_config_with(None, env(&[("VECTORSTORE", "PINECONE")])).unwrap_err();
        assert!(matches!(err, RagError::UnsupportedProvider(_)));
    }

    #[test]
    fn test_file_layer_then_env() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[store]
local_dir = "from-file"

[chunking]
chunk_size = 400
chunk_overlap = 40

[retrieval]
k = 6
prompt = "strict"

[mongodb]
text_key = "body"
"#,
        );
        let config =
            resolve_config_with(Some(&path), env(&[("LOCAL_INDEX_DIR", "from-env")])).unwrap();
        assert_eq!(config.store.local_dir, PathBuf::from("from-env"));
        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.chunk_overlap, 40);
        assert_eq!(config.retrieval.k, 6);
        assert_eq!(config.retrieval.prompt, "strict");
        assert_eq!(config.mongodb.text_key, "body");
        assert_eq!(config.mongodb.embedding_key, "embedding");
    }

    #[test]
    fn test_invalid_chunking_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n");
        let err = resolve_config_with(Some(&path), env(&[])).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));

        let path = write_config(&dir, "[chunking]\nchunk_size = 0\nchunk_overlap = 0\n");
        let err = resolve_config_with(Some(&path), env(&[])).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn test_zero_k_and_batch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[retrieval]\nk = 0\n");
        assert!(matches!(
            resolve_config_with(Some(&path), env(&[])),
            Err(RagError::Configuration(_))
        ));

        let path = write_config(&dir, "[embedding]\nbatch_size = 0\n");
        assert!(matches!(
            resolve_config_with(Some(&path), env(&[])),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_unreadable_and_malformed_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            resolve_config_with(Some(&missing), env(&[])),
            Err(RagError::Configuration(_))
        ));

        let path = write_config(&dir, "[chunking\nchunk_size = ");
        assert!(matches!(
            resolve_config_with(Some(&path), env(&[])),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_provider_names_not_checked_at_resolve() {
        let config =
            resolve_config_with(None, env(&[("EMBEDDINGS", "COHERE"), ("LLM_PROVIDER", "X")]))
                .unwrap();
        assert_eq!(config.embedding.provider, "COHERE");
        assert_eq!(config.llm.provider, "X");
    }
}
