//! Language model providers.
//!
//! | Config Value | Provider |
//! |-------------|----------|
//! | `OPENAI` | [`OpenAiGenerator`]: `POST {base_url}/chat/completions` |
//! | `OLLAMA` | [`OllamaGenerator`]: `POST {ollama_url}/api/chat`, non-streaming (feature `ollama`) |
//!
//! Both send the rendered template as a system + user message pair with the
//! configured temperature (0 by default).

use async_trait::async_trait;
use ragfile_core::llm::{ChatPrompt, Generator};
use ragfile_core::{RagError, Result};
use serde_json::Value;

use crate::config::Config;
use crate::http::{build_client, post_json, JsonRequest};

/// Recognised values of `llm.provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "OPENAI" => Ok(Self::OpenAi),
            "OLLAMA" => Ok(Self::Ollama),
            _ => Err(RagError::UnsupportedProvider(format!(
                "LLM provider '{}'. Must be OPENAI or OLLAMA.",
                name
            ))),
        }
    }
}

/// Build the language model selected by `config`.
///
/// # Errors
///
/// - [`RagError::UnsupportedProvider`] for an unknown provider name.
/// - [`RagError::DependencyUnavailable`] for `OLLAMA` when built without the
///   `ollama` feature.
/// - [`RagError::Configuration`] for `OPENAI` without an API key.
pub fn make_llm(config: &Config) -> Result<Box<dyn Generator>> {
    match LlmProvider::parse(&config.llm.provider)? {
        LlmProvider::OpenAi => Ok(Box::new(OpenAiGenerator::new(config)?)),
        #[cfg(feature = "ollama")]
        LlmProvider::Ollama => Ok(Box::new(OllamaGenerator::new(config)?)),
        #[cfg(not(feature = "ollama"))]
        LlmProvider::Ollama => Err(RagError::DependencyUnavailable(
            "LLM_PROVIDER=OLLAMA requires building with --features ollama".to_string(),
        )),
    }
}

fn messages(prompt: &ChatPrompt) -> Value {
    serde_json::json!([
        { "role": "system", "content": prompt.system },
        { "role": "user", "content": prompt.user },
    ])
}

// ============ OpenAI ============

pub struct OpenAiGenerator {
    client: reqwest::Client,
    model: String,
    url: String,
    api_key: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.openai.api_key.clone().ok_or_else(|| {
            RagError::Configuration("OPENAI_API_KEY is required for LLM_PROVIDER=OPENAI".to_string())
        })?;
        Ok(Self {
            client: build_client(config.llm.timeout_secs)?,
            model: config.llm.openai_model.clone(),
            url: format!(
                "{}/chat/completions",
                config.openai.base_url.trim_end_matches('/')
            ),
            api_key,
            temperature: config.llm.temperature,
            max_retries: config.llm.max_retries,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &ChatPrompt) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages(prompt),
            "temperature": self.temperature,
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
        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RagError::Provider("invalid OpenAI response: missing choices[0].message.content".into())
            })
    }
}

// ============ Ollama ============

#[cfg(feature = "ollama")]
pub struct OllamaGenerator {
    client: reqwest::Client,
    model: String,
    url: String,
    temperature: f32,
    max_retries: u32,
}

#[cfg(feature = "ollama")]
impl OllamaGenerator {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_client(config.llm.timeout_secs)?,
            model: config.llm.ollama_model.clone(),
            url: format!("{}/api/chat", config.llm.ollama_url.trim_end_matches('/')),
            temperature: config.llm.temperature,
            max_retries: config.llm.max_retries,
        })
    }
}

#[cfg(feature = "ollama")]
#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &ChatPrompt) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages(prompt),
            "stream": false,
            "options": { "temperature": self.temperature },
        });
        let json = post_json(
            &self.client,
            JsonRequest {
                provider: "Ollama",
                url: &self.url,
                bearer: None,
                body: &body,
                max_retries: self.max_retries,
            },
        )
        .await?;
        json.pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| RagError::Provider("invalid Ollama response: missing message.content".into()))
    }
}
