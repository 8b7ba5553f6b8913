//! Named prompt templates and context formatting.
//!
//! Templates are chat-style: a system message plus a user message carrying
//! `{question}` and `{context}` placeholders. Each template also names the
//! phrase it expects the model to use when the context cannot answer the
//! question; the answering pipeline returns that phrase directly when
//! retrieval finds nothing.
//!
//! | Name | Behaviour |
//! |------|-----------|
//! | `default` | Grounded and concise; says "I don't know." when context is insufficient |
//! | `strict` | Forbids unsupported claims; mandates an exact refusal phrase |

use crate::error::{RagError, Result};
use crate::llm::ChatPrompt;
use crate::models::Chunk;

/// Name of the template used when the caller does not pick one.
pub const DEFAULT_PROMPT: &str = "default";

/// Separator placed between chunks in the rendered context.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// A named prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub system: &'static str,
    /// User message with `{question}` and `{context}` placeholders.
    pub user: &'static str,
    /// What the model is told to say when the context is insufficient.
    pub refusal: &'static str,
}

static PROMPTS: &[PromptTemplate] = &[
    PromptTemplate {
        name: "default",
        description: "Grounded and concise; cites chunk ids when useful",
        system: "You are a careful assistant. Answer the user using only the provided context. \
                 If the answer cannot be found, say you do not know. \
                 Cite sources by chunk id and page when useful.",
        user: "Question: {question}\n\n\
               Context:\n{context}\n\n\
               Rules:\n- Use only the context.\n- Be concise.\n- If insufficient context, say 'I don't know.'",
        refusal: "I don't know.",
    },
    PromptTemplate {
        name: "strict",
        description: "Never speculates; exact refusal phrase when context is insufficient",
        system: "You must only answer from the provided context. If the context is insufficient, \
                 reply exactly: 'I don't know based on the provided documents.' \
                 Do not make any claim the context does not support. Include citations for any claims.",
        user: "Answer the question strictly from the context.\nQuestion: {question}\n\nContext:\n{context}",
        refusal: "I don't know based on the provided documents.",
    },
];

/// All registered templates, in registry order.
pub fn prompts() -> &'static [PromptTemplate] {
    PROMPTS
}

/// Names of all registered templates.
pub fn prompt_names() -> Vec<&'static str> {
    PROMPTS.iter().map(|p| p.name).collect()
}

/// Look up a template by name.
///
/// # Errors
///
/// [`RagError::UnknownPrompt`] if `name` is not registered.
pub fn get_prompt(name: &str) -> Result<&'static PromptTemplate> {
    PROMPTS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| RagError::UnknownPrompt {
            name: name.to_string(),
            available: prompt_names().join(", "),
        })
}

impl PromptTemplate {
    /// Substitute the question and context into the template.
    ///
    /// Substitution is a single pass over the template text, so braces
    /// inside the question or context are never re-expanded.
    pub fn render(&self, question: &str, context: &str) -> ChatPrompt {
        let vars = [("question", question), ("context", context)];
        ChatPrompt {
            system: fill(self.system, &vars),
            user: fill(self.user, &vars),
        }
    }
}

/// Render chunks into one context string, in rank order.
///
/// Each chunk gets a citation header with its id, source, and page; chunks
/// are joined by [`CONTEXT_DELIMITER`].
pub fn format_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| {
            let page = c
                .page
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".to_string());
            format!(
                "[chunk_id={} | source={} | page={}]\n{}",
                c.id, c.source, page, c.content
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match hit {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
