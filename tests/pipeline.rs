//! End-to-end pipeline tests over the LOCAL backend.
//!
//! Embedding and generation use deterministic in-process doubles so the
//! tests exercise loading, splitting, storage, retrieval and prompt
//! assembly without any network access.

use async_trait::async_trait;
use ragfile::config::Config;
use ragfile::ingest::{embed_and_store_with, split};
use ragfile::loader;
use ragfile::store::local::LocalIndex;
use ragfile::store::make_vector_store;
use ragfile_core::answer::answer_with;
use ragfile_core::chunk::{split_documents, SplitParams};
use ragfile_core::embedding::Embedder;
use ragfile_core::llm::{ChatPrompt, Generator};
use ragfile_core::models::Document;
use ragfile_core::store::VectorStore;
use ragfile_core::{RagError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

// ─── Doubles ────────────────────────────────────────────────────────

/// Letter-frequency embedding over a–z.
struct LetterEmbedder;

fn letters(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
    }
    v
}

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model_name(&self) -> &str {
        "letters-26"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| letters(t)).collect())
    }
}

/// Answers with the first line of context after the header; counts calls.
#[derive(Default)]
struct QuotingGenerator {
    calls: AtomicUsize,
    prompts: Mutex<Vec<ChatPrompt>>,
}

#[async_trait]
impl Generator for QuotingGenerator {
    fn model_name(&self) -> &str {
        "quoting"
    }

    async fn generate(&self, prompt: &ChatPrompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        let quoted = prompt
            .user
            .lines()
            .skip_while(|l| !l.starts_with("[chunk_id="))
            .nth(1)
            .unwrap_or("I don't know.")
            .to_string();
        Ok(format!("The context says: {}", quoted))
    }
}

fn config_in(tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.store.local_dir = tmp.path().join("index");
    config
}

/// Minimal PDF with one text line per page; empty strings make blank pages.
fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let n = pages.len();
    let font_id = 3 + 2 * n;
    let mut offsets = Vec::new();
    let mut out = b"%PDF-1.4\n".to_vec();
    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
            kids.join(" "),
            n
        )
        .as_bytes(),
    );
    for (i, text) in pages.iter().enumerate() {
        let page_id = 3 + 2 * i;
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >> endobj\n",
                page_id,
                page_id + 1,
                font_id
            )
            .as_bytes(),
        );
        let stream = if text.is_empty() {
            String::new()
        } else {
            format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text)
        };
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                page_id + 1,
                stream.len(),
                stream
            )
            .as_bytes(),
        );
    }
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "{} 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
            font_id
        )
        .as_bytes(),
    );
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for o in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", o).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fox_document_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let text = "The quick brown fox. The fox runs fast.";

    let docs = loader::load_text("fox.txt", text);
    let chunks = split(&config, &docs).unwrap();
    assert_eq!(chunks.len(), 1);

    let index = LocalIndex::open_or_create(&config.store.local_dir, "letters-26").unwrap();
    let stored = embed_and_store_with(&LetterEmbedder, &index, &chunks, 64)
        .await
        .unwrap();
    assert_eq!(stored, 1);

    let store = make_vector_store(&config).await.unwrap();
    let generator = QuotingGenerator::default();
    let record = answer_with(
        &LetterEmbedder,
        store.as_ref(),
        &generator,
        "What animal is mentioned?",
        4,
        "default",
    )
    .await
    .unwrap();

    assert_eq!(record.sources.len(), 1);
    assert_eq!(record.sources[0].preview, text);
    assert_eq!(record.sources[0].source, "fox.txt");
    assert_eq!(record.sources[0].page, None);
    assert_eq!(record.sources[0].chunk_id, chunks[0].id);
    assert!(record.answer.contains("fox"));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_question_before_ingestion() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);

    // No index on disk: resolving the LOCAL store fails.
    assert!(matches!(
        make_vector_store(&config).await,
        Err(RagError::NotFound(_))
    ));

    // An index that exists but holds nothing answers with the refusal.
    let index = LocalIndex::open_or_create(&config.store.local_dir, "letters-26").unwrap();
    index.save().unwrap();
    let store = make_vector_store(&config).await.unwrap();
    assert!(store
        .similarity_search(&letters("anything"), 4)
        .await
        .unwrap()
        .is_empty());

    let generator = QuotingGenerator::default();
    let record = answer_with(
        &LetterEmbedder,
        store.as_ref(),
        &generator,
        "What animal is mentioned?",
        4,
        "strict",
    )
    .await
    .unwrap();
    assert_eq!(record.answer, "I don't know based on the provided documents.");
    assert!(record.sources.is_empty());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_prompt_never_reaches_model() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let index = LocalIndex::open_or_create(&config.store.local_dir, "letters-26").unwrap();
    let generator = QuotingGenerator::default();

    let err = answer_with(&LetterEmbedder, &index, &generator, "", 4, "unknown_prompt")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::UnknownPrompt { .. }));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reload_gives_identical_results_and_reingest_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let mut config = config_in(&tmp);
    config.chunking.chunk_size = 120;
    config.chunking.chunk_overlap = 20;

    let text = [
        "Rust is a systems programming language focused on safety.",
        "Foxes are small omnivorous mammals found across the northern hemisphere.",
        "Vector indexes store embeddings and answer nearest neighbour queries.",
        "The quick brown fox jumps over the lazy dog near the river bank.",
        "Zebras have black and white stripes that confuse predators.",
    ]
    .join("\n\n");
    let chunks = split(&config, &loader::load_text("notes.md", &text)).unwrap();
    assert!(chunks.len() >= 3);

    let index = LocalIndex::open_or_create(&config.store.local_dir, "letters-26").unwrap();
    embed_and_store_with(&LetterEmbedder, &index, &chunks, 2)
        .await
        .unwrap();

    let query = letters("fox jumps");
    let before = index.similarity_search(&query, 3).await.unwrap();

    let reopened = LocalIndex::open(&config.store.local_dir).unwrap();
    let after = reopened.similarity_search(&query, 3).await.unwrap();
    assert_eq!(before, after);

    embed_and_store_with(&LetterEmbedder, &reopened, &chunks, 2)
        .await
        .unwrap();
    assert_eq!(reopened.count().await.unwrap(), chunks.len());
    assert_eq!(
        LocalIndex::open(&config.store.local_dir)
            .unwrap()
            .count()
            .await
            .unwrap(),
        chunks.len()
    );
}

#[tokio::test]
async fn test_self_similarity_over_split_document() {
    let tmp = TempDir::new().unwrap();
    let mut config = config_in(&tmp);
    config.chunking.chunk_size = 80;
    config.chunking.chunk_overlap = 10;

    let text = "alpha beta gamma delta. ".repeat(20);
    let chunks = split(&config, &loader::load_text("greek.txt", &text)).unwrap();
    let index = LocalIndex::open_or_create(&config.store.local_dir, "letters-26").unwrap();
    embed_and_store_with(&LetterEmbedder, &index, &chunks, 64)
        .await
        .unwrap();

    for chunk in &chunks {
        let hits = index
            .similarity_search(&letters(&chunk.content), 1)
            .await
            .unwrap();
        // Identical windows share a vector; the top hit must score as the chunk itself.
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_split_reconstructs_original_text() {
    let params = SplitParams::new(50, 12).unwrap();
    let text = "One fish. Two fish.\n\nRed fish, blue fish.\nThis one has a little star. \
                This one has a little car. Say! What a lot of fish there are."
        .to_string();
    let chunks = split_documents(&[Document::new(text.clone(), "seuss.txt", None)], params);

    let mut rebuilt = String::new();
    for c in &chunks {
        let covered = rebuilt.chars().count();
        assert!(c.start_index <= covered, "gap before chunk at {}", c.start_index);
        let skip = covered - c.start_index;
        rebuilt.extend(c.content.chars().skip(skip));
    }
    assert_eq!(rebuilt, text);
}

#[tokio::test]
async fn test_pdf_pages_carry_through_to_sources() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);

    let pdf = pdf_with_pages(&["zebra stripes page", "fox den page"]);
    let docs = loader::load_bytes("animals.pdf", &pdf).unwrap();
    assert_eq!(docs.len(), 2);

    let chunks = split(&config, &docs).unwrap();
    let index = LocalIndex::open_or_create(&config.store.local_dir, "letters-26").unwrap();
    embed_and_store_with(&LetterEmbedder, &index, &chunks, 64)
        .await
        .unwrap();

    let generator = QuotingGenerator::default();
    let record = answer_with(&LetterEmbedder, &index, &generator, "fox den", 1, "default")
        .await
        .unwrap();
    assert_eq!(record.sources.len(), 1);
    assert_eq!(record.sources[0].source, "animals.pdf");
    assert_eq!(record.sources[0].page, Some(1));
    assert!(record.sources[0].preview.contains("fox den page"));

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].user.contains("source=animals.pdf | page=1]"));
}

#[test]
fn test_pdf_yields_every_page_numbered_from_zero() {
    let pdf = pdf_with_pages(&["alpha page phrase", "", "gamma page phrase"]);
    let docs = loader::load_bytes("doc.pdf", &pdf).unwrap();

    assert_eq!(docs.len(), 3);
    let pages: Vec<Option<u32>> = docs.iter().map(|d| d.page).collect();
    assert_eq!(pages, vec![Some(0), Some(1), Some(2)]);
    assert!(docs[0].content.contains("alpha page phrase"));
    assert!(docs[1].content.trim().is_empty());
    assert!(docs[2].content.contains("gamma page phrase"));
    assert!(docs.iter().all(|d| d.source == "doc.pdf"));
}

#[tokio::test]
async fn test_blank_pdf_page_stores_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);

    let pdf = pdf_with_pages(&["alpha page phrase", "", "gamma page phrase"]);
    let docs = loader::load_bytes("doc.pdf", &pdf).unwrap();
    let chunks = split(&config, &docs).unwrap();
    let index = LocalIndex::open_or_create(&config.store.local_dir, "letters-26").unwrap();
    let stored = embed_and_store_with(&LetterEmbedder, &index, &chunks, 64)
        .await
        .unwrap();

    assert_eq!(stored, 2);
    assert_eq!(index.count().await.unwrap(), 2);
    let hits = index
        .similarity_search(&letters("gamma page phrase"), 4)
        .await
        .unwrap();
    let pages: Vec<Option<u32>> = hits.iter().map(|h| h.chunk.page).collect();
    assert!(pages.contains(&Some(0)) && pages.contains(&Some(2)));
    assert!(!pages.contains(&Some(1)));
}
