//! Embedding gateway.
//!
//! External embedding APIs do not keep a stable response schema across
//! versions, so all shape handling lives here: an [`EmbeddingCapability`]
//! returns the provider's raw JSON and [`EmbeddingGateway::embed`]
//! normalizes it through an ordered set of shape matchers. Callers only
//! ever see a flat `Vec<f32>` or an error.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::QaError;

/// External embedding capability: text in, raw provider JSON out.
///
/// Implemented by [`HttpEmbedder`](crate::provider::HttpEmbedder) in
/// production and by scripted mocks in tests.
#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    async fn embed_raw(&self, text: &str) -> Result<Value, QaError>;
}

/// Normalization boundary in front of an [`EmbeddingCapability`].
pub struct EmbeddingGateway {
    backend: Box<dyn EmbeddingCapability>,
}

impl EmbeddingGateway {
    pub fn new(backend: Box<dyn EmbeddingCapability>) -> Self {
        Self { backend }
    }

    /// Embed a single text, normalizing whatever response shape the
    /// backend produced.
    ///
    /// # Errors
    ///
    /// Propagates the backend's call failure, or returns
    /// [`QaError::UnrecognizedResponseShape`] when the response matches
    /// no known shape.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, QaError> {
        let raw = self.backend.embed_raw(text).await?;
        normalize_embedding_response(&raw)
    }
}

/// Try known embedding response shapes in order:
///
/// 1. direct vector field: `{"embedding": [..]}`
/// 2. list of results: `{"data": [{"embedding": [..]}, ..]}` (first entry)
/// 3. nested list: `{"embeddings": [[..], ..]}` (first entry)
///
/// Anything else fails with a truncated diagnostic dump of the payload.
pub fn normalize_embedding_response(raw: &Value) -> Result<Vec<f32>, QaError> {
    if let Some(vec) = raw.get("embedding").and_then(as_f32_vec) {
        return Ok(vec);
    }

    if let Some(vec) = raw
        .get("data")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("embedding"))
        .and_then(as_f32_vec)
    {
        return Ok(vec);
    }

    if let Some(vec) = raw
        .get("embeddings")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(as_f32_vec)
    {
        return Ok(vec);
    }

    Err(QaError::unrecognized_shape("embeddings", raw))
}

fn as_f32_vec(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}
