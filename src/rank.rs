//! Cosine-similarity ranking of stored chunks against a query vector.

use crate::models::Chunk;

/// A chunk scored against a query embedding. Borrows the chunk text so
/// ranking a large document allocates nothing per candidate.
#[derive(Debug, Clone)]
pub struct RankedChunk<'a> {
    pub text: &'a str,
    pub score: f32,
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns exactly `0.0` when either vector has zero magnitude or the
/// lengths differ: a degenerate embedding ranks as maximally dissimilar
/// rather than raising a division-by-zero error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Score every chunk against `query` and order by descending similarity.
///
/// The sort is stable, so equal scores keep the original chunk order and
/// retrieval stays deterministic.
pub fn rank_chunks<'a>(query: &[f32], chunks: &'a [Chunk]) -> Vec<RankedChunk<'a>> {
    let mut ranked: Vec<RankedChunk<'a>> = chunks
        .iter()
        .map(|c| RankedChunk {
            text: &c.text,
            score: cosine_similarity(query, &c.embedding),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ranked
}
