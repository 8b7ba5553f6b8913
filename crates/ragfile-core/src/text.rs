//! Small, explicit text transformations.
//!
//! Both helpers are character-aware: lengths are counted in Unicode scalar
//! values, never bytes, so multi-byte text is never split mid-character.

/// Maximum characters kept in a source preview.
pub const PREVIEW_CHARS: usize = 250;

/// Appended to a preview when content was cut.
pub const TRUNCATION_MARKER: &str = "...";

/// Cut `text` to at most `max_chars` characters.
///
/// Text of exactly `max_chars` characters or fewer is returned unchanged.
/// Longer text keeps its first `max_chars` characters followed by
/// [`TRUNCATION_MARKER`].
///
/// # Example
///
/// ```rust
/// use ragfile_core::text::truncate;
///
/// assert_eq!(truncate("abcdef", 3), "abc...");
/// assert_eq!(truncate("abc", 3), "abc");
/// ```
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Decode bytes as UTF-8, dropping any invalid byte sequences.
///
/// Valid runs are kept verbatim; invalid bytes are discarded rather than
/// replaced with `U+FFFD`.
pub fn decode_lenient(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
