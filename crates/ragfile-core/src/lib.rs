//! # ragfile core
//!
//! Shared, I/O-free logic for ragfile: data models, typed errors, text
//! helpers, chunking, the capability traits (embedding, generation, vector
//! storage), the prompt registry, and the retrieval-augmented answering
//! algorithm.
//!
//! This crate performs no network or filesystem I/O. Concrete providers and
//! storage backends live in the `ragfile` application crate and are plugged
//! in through [`embedding::Embedder`], [`llm::Generator`], and
//! [`store::VectorStore`].

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod store;
pub mod text;

pub use error::{RagError, Result};
