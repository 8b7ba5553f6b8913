//! Question answering against the configured providers.

use ragfile_core::answer::answer_with;
use ragfile_core::models::AnswerRecord;
use ragfile_core::prompt::get_prompt;
use ragfile_core::Result;

use crate::config::Config;
use crate::embedding::make_embedder;
use crate::llm::make_llm;
use crate::store::make_vector_store;

/// Answer `question` from the top `k` chunks using the prompt template
/// named `prompt_name`.
///
/// The template name is checked first, then the store is opened, then the
/// embedder and language model are built. The first failure is returned.
///
/// # Errors
///
/// - [`RagError::UnknownPrompt`](ragfile_core::RagError::UnknownPrompt)
///   before any backend is contacted.
/// - [`RagError::NotFound`](ragfile_core::RagError::NotFound) for the
///   `LOCAL` backend when nothing has been ingested.
/// - Any factory or provider failure.
pub async fn answer(
    config: &Config,
    question: &str,
    k: usize,
    prompt_name: &str,
) -> Result<AnswerRecord> {
    get_prompt(prompt_name)?;
    let store = make_vector_store(config).await?;
    let embedder = make_embedder(config)?;
    let llm = make_llm(config)?;
    answer_with(
        embedder.as_ref(),
        store.as_ref(),
        llm.as_ref(),
        question,
        k,
        prompt_name,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragfile_core::RagError;
    use tempfile::TempDir;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.store.local_dir = dir.join("idx");
        config
    }

    #[tokio::test]
    async fn test_unknown_prompt_checked_before_store() {
        let tmp = TempDir::new().unwrap();
        let err = answer(&config_in(tmp.path()), "", 4, "unknown_prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnknownPrompt { .. }));
    }

    #[tokio::test]
    async fn test_missing_local_index_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = answer(&config_in(tmp.path()), "What?", 4, "default")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NotFound(_)));
    }
}
