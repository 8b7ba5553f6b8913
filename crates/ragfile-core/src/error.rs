//! Typed failures shared by every pipeline stage.

use thiserror::Error;

/// Every failure the ingestion and answering pipeline can raise.
///
/// The pipeline fails fast: the first invalid condition is returned to the
/// caller unchanged, with no retries or partial recovery at this level.
#[derive(Debug, Error)]
pub enum RagError {
    /// A required setting is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A backend or provider name was not recognised.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// An optional component was selected but is not compiled in.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// The input file extension is neither PDF nor text.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// An expected local index or input file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A network or database call failed.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The requested prompt template is not registered.
    #[error("unknown prompt: '{name}'. Available: {available}")]
    UnknownPrompt { name: String, available: String },

    /// A provider rejected the request or returned an unusable payload.
    #[error("provider error: {0}")]
    Provider(String),

    /// A document could not be converted to text.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The local index exists but cannot be decoded.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout ragfile.
pub type Result<T, E = RagError> = std::result::Result<T, E>;
