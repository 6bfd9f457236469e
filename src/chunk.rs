//! Fixed-window text chunker.
//!
//! Splits extracted document text into overlapping windows of a fixed
//! character length. The overlap carries context across window edges so
//! a sentence cut at one boundary still appears whole in its neighbor.
//!
//! Windows are measured in characters, not bytes, so multi-byte input
//! never splits a code point.

use anyhow::{bail, Result};

/// Default window length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;
/// Default overlap between adjacent windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Split `text` into windows of `size` characters starting every
/// `size - overlap` characters. The final window may be shorter than
/// `size`; empty input yields no chunks. A window that reaches the end
/// of the text is the last one: no trailing window starting inside the
/// final overlap is emitted, so for text longer than `size` the chunk
/// count is `ceil((len - overlap) / (size - overlap))`.
///
/// Rejects `size == 0` and `overlap >= size`, since a non-positive step
/// would never make progress.
///
/// Deterministic: the same input and parameters always yield the same
/// sequence.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    if size == 0 {
        bail!("chunk size must be greater than zero");
    }
    if overlap >= size {
        bail!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap,
            size
        );
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let end = (start + size).min(len);
        chunks.push(chars[start..end].iter().collect());
        if end == len {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
