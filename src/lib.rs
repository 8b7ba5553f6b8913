//! # ragfile
//!
//! Ingest a PDF or text file into a vector store and answer questions
//! about it with a language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌────────────────────┐
//! │  Loader  │──▶│ Split+Embed │──▶│    Vector store     │
//! │ PDF/Text │   │  (batched)  │   │ LOCAL file / Atlas  │
//! └──────────┘   └─────────────┘   └─────────┬──────────┘
//!                                            │ top-k
//!                                            ▼
//!                                  ┌────────────────────┐
//!                                  │ Prompt + LLM call  │──▶ answer + sources
//!                                  └────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragfile ingest resume.pdf
//! ragfile ask "What roles has this person held?"
//! ragfile ask "Which years?" --prompt strict --k 6
//! ragfile serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Defaults → TOML → environment resolution |
//! | [`loader`] | PDF and text loading |
//! | [`embedding`] | OpenAI and local HF embedders |
//! | [`llm`] | OpenAI and Ollama chat models |
//! | [`store`] | LOCAL index and MongoDB Atlas backends |
//! | [`ingest`] | Load → split → embed → store |
//! | [`answer`] | Retrieval-augmented answering |
//! | [`server`] | JSON HTTP API |
//!
//! Pure logic (chunking, prompts, the answering algorithm) lives in
//! [`ragfile_core`].

pub mod answer;
pub mod config;
pub mod embedding;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod logging;
pub mod server;
pub mod store;

pub use ragfile_core::{RagError, Result};
