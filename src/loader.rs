//! Document loading: PDF and plain text into [`Document`]s.
//!
//! PDF input yields one document per page, numbered from 0, including pages
//! with no extractable text (ingestion skips their blank chunks). Text
//! input yields exactly one document with no page. Text bytes are decoded
//! leniently: invalid UTF-8 sequences are dropped.

use std::path::Path;

use ragfile_core::models::Document;
use ragfile_core::text::decode_lenient;
use ragfile_core::{RagError, Result};

/// Input formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    /// Classify a file by the extension of `name`, case-insensitively.
    ///
    /// `.pdf` is PDF; `.txt` and `.md` are text.
    pub fn from_name(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pdf") => Ok(Self::Pdf),
            Some("txt") | Some("md") => Ok(Self::Text),
            _ => Err(RagError::UnsupportedFileType(format!(
                "'{}' (expected .pdf, .txt or .md)",
                name
            ))),
        }
    }
}

/// Load the file at `path`. Documents carry the file name as their source.
///
/// # Errors
///
/// - [`RagError::UnsupportedFileType`] for an unrecognised extension.
/// - [`RagError::NotFound`] if the file does not exist.
/// - [`RagError::Extraction`] if a PDF cannot be parsed.
pub fn load(path: &Path) -> Result<Vec<Document>> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    FileKind::from_name(&name)?;
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            RagError::NotFound(format!("input file {}", path.display()))
        }
        _ => RagError::Io(e),
    })?;
    load_bytes(&name, &bytes)
}

/// Load an uploaded file from its name and raw bytes.
pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<Vec<Document>> {
    match FileKind::from_name(name)? {
        FileKind::Pdf => load_pdf(name, bytes),
        FileKind::Text => Ok(load_text(name, &decode_lenient(bytes))),
    }
}

/// Wrap already-decoded text as a single document.
pub fn load_text(name: &str, text: &str) -> Vec<Document> {
    vec![Document::new(text, name, None)]
}

fn load_pdf(name: &str, bytes: &[u8]) -> Result<Vec<Document>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| RagError::Extraction(format!("{}: {}", name, e)))?;

    let docs: Vec<Document> = pages
        .into_iter()
        .zip(0u32..)
        .map(|(text, page)| Document::new(text, name, Some(page)))
        .collect();

    tracing::debug!(source = name, pages = docs.len(), "loaded PDF");
    Ok(docs)
}
