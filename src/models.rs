//! Core data models for uploaded documents and their Q&A history.
//!
//! All types serialize with serde: the document store writes its entire
//! state through these shapes, so they double as the durable format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contiguous slice of document text paired with its embedding vector.
///
/// Created once at ingestion time and immutable thereafter. Every chunk
/// of one document carries a vector of the same length (the dimensionality
/// the embedding provider produced at upload time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// One question/answer exchange against a document.
///
/// History is append-only; insertion order is chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// An uploaded document: its chunks and its conversation history.
///
/// Owned exclusively by the document store. Created on successful upload,
/// mutated only by history append, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub chunks: Vec<Chunk>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

/// Lightweight listing row: everything a client needs to show a document
/// without pulling its chunks and vectors over the wire.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub chunk_count: usize,
    pub history_count: usize,
    pub created_at: DateTime<Utc>,
}
