//! Upload pipeline: extract → chunk → embed → persist.
//!
//! Chunk embeddings are computed strictly one at a time, in chunk order.
//! That is a deliberate backpressure policy against provider rate
//! limits; do not parallelize it.
//!
//! An upload is atomic: the document reaches the store only after every
//! chunk has an embedding, so any extraction or embedding failure leaves
//! no partial document behind.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingGateway;
use crate::error::QaError;
use crate::extract::extract_text;
use crate::models::{Chunk, Document};
use crate::store::DocumentStore;

/// What the caller gets back from a completed upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub id: String,
    pub filename: String,
    pub chunk_count: usize,
}

/// Ingest an uploaded file: extract its text per `format_hint`, chunk
/// it, embed each chunk sequentially, and persist the finished document.
pub async fn ingest_document(
    store: &DocumentStore,
    gateway: &EmbeddingGateway,
    chunking: &ChunkingConfig,
    filename: &str,
    bytes: &[u8],
    format_hint: &str,
) -> Result<UploadReceipt> {
    let text = extract_text(bytes, format_hint)?;
    let pieces = chunk_text(&text, chunking.size, chunking.overlap)?;

    // v7 UUIDs are time-ordered, so upload ids sort by creation time.
    let id = Uuid::now_v7().to_string();
    tracing::info!(document = %id, filename, chunks = pieces.len(), "embedding upload");

    let mut chunks: Vec<Chunk> = Vec::with_capacity(pieces.len());
    for (index, piece) in pieces.into_iter().enumerate() {
        let embedding = gateway.embed(&piece).await?;
        // Mismatched vector lengths would rank at score 0 forever, so a
        // provider drifting dimensionality mid-upload aborts the upload.
        if let Some(first) = chunks.first() {
            if embedding.len() != first.embedding.len() {
                return Err(QaError::ExternalCapability(format!(
                    "embedding dimensionality changed mid-upload: chunk {} has {} dims, expected {}",
                    index,
                    embedding.len(),
                    first.embedding.len()
                ))
                .into());
            }
        }
        tracing::debug!(document = %id, chunk = index, dims = embedding.len(), "chunk embedded");
        chunks.push(Chunk {
            text: piece,
            embedding,
        });
    }

    let chunk_count = chunks.len();
    store.put(Document {
        id: id.clone(),
        filename: filename.to_string(),
        chunks,
        history: Vec::new(),
        created_at: Utc::now(),
    })?;

    Ok(UploadReceipt {
        id,
        filename: filename.to_string(),
        chunk_count,
    })
}
