//! Text-generation trait.
//!
//! Concrete chat backends (OpenAI, Ollama) live in the `ragfile` app crate.

use async_trait::async_trait;

use crate::error::Result;

/// A rendered two-message chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// A language model that turns a prompt into text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Invoke the model once and return its raw text output.
    async fn generate(&self, prompt: &ChatPrompt) -> Result<String>;
}
