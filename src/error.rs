//! Error kinds surfaced by the question-answering core.
//!
//! One enum covers every failure the core can report, so the HTTP layer
//! and CLI can map each kind to a structured failure response.
//! Orchestration code that mixes these with I/O errors wraps them in
//! `anyhow::Error`; handlers downcast to recover the kind.

use serde_json::Value;

/// Maximum characters of raw provider payload carried inside an error
/// or a fallback answer.
const PAYLOAD_DUMP_LIMIT: usize = 400;

/// A failure on the upload or question path.
#[derive(Debug)]
pub enum QaError {
    /// The upload's format hint names a format we cannot extract.
    UnsupportedFormat(String),
    /// An AI provider responded with JSON that matched no known shape.
    UnrecognizedResponseShape {
        endpoint: &'static str,
        payload: String,
    },
    /// The question was blank after trimming whitespace.
    EmptyQuestion,
    /// No document with the given id exists in the store.
    NotFound(String),
    /// A document with the given id already exists in the store.
    DuplicateId(String),
    /// The durable store could not be read or written.
    Persistence(String),
    /// An external provider call itself failed (network, auth, HTTP status).
    ExternalCapability(String),
}

impl QaError {
    /// Build an [`UnrecognizedResponseShape`](QaError::UnrecognizedResponseShape)
    /// carrying a truncated diagnostic dump of the raw payload.
    pub fn unrecognized_shape(endpoint: &'static str, payload: &Value) -> Self {
        QaError::UnrecognizedResponseShape {
            endpoint,
            payload: truncate_payload(payload),
        }
    }

    /// Machine-readable code used in JSON error responses.
    pub fn code(&self) -> &'static str {
        match self {
            QaError::UnsupportedFormat(_) => "unsupported_format",
            QaError::UnrecognizedResponseShape { .. } => "unrecognized_response_shape",
            QaError::EmptyQuestion => "empty_question",
            QaError::NotFound(_) => "not_found",
            QaError::DuplicateId(_) => "duplicate_id",
            QaError::Persistence(_) => "persistence",
            QaError::ExternalCapability(_) => "external_capability",
        }
    }
}

impl std::fmt::Display for QaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QaError::UnsupportedFormat(hint) => {
                write!(f, "unsupported document format: {}", hint)
            }
            QaError::UnrecognizedResponseShape { endpoint, payload } => {
                write!(
                    f,
                    "unrecognized {} response shape: {}",
                    endpoint, payload
                )
            }
            QaError::EmptyQuestion => write!(f, "question must not be empty"),
            QaError::NotFound(id) => write!(f, "document not found: {}", id),
            QaError::DuplicateId(id) => write!(f, "document id already exists: {}", id),
            QaError::Persistence(msg) => write!(f, "durable store failure: {}", msg),
            QaError::ExternalCapability(msg) => write!(f, "provider call failed: {}", msg),
        }
    }
}

impl std::error::Error for QaError {}

/// Render a provider payload for diagnostics, bounded in size so a huge
/// response body never ends up in a log line or an error message whole.
pub fn truncate_payload(value: &Value) -> String {
    let mut dump = value.to_string();
    if dump.len() > PAYLOAD_DUMP_LIMIT {
        let mut cut = PAYLOAD_DUMP_LIMIT;
        while !dump.is_char_boundary(cut) {
            cut -= 1;
        }
        dump.truncate(cut);
        dump.push_str("...");
    }
    dump
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncate_short_payload_is_identity() {
        let v = json!({"data": [1, 2, 3]});
        assert_eq!(truncate_payload(&v), v.to_string());
    }

    #[test]
    fn truncate_long_payload_is_bounded() {
        let v = json!({ "blob": "x".repeat(10_000) });
        let dump = truncate_payload(&v);
        assert!(dump.len() <= PAYLOAD_DUMP_LIMIT + 3);
        assert!(dump.ends_with("..."));
    }

    #[test]
    fn shape_error_carries_truncated_dump() {
        let v = json!({ "blob": "y".repeat(10_000) });
        let err = QaError::unrecognized_shape("embeddings", &v);
        match err {
            QaError::UnrecognizedResponseShape { endpoint, payload } => {
                assert_eq!(endpoint, "embeddings");
                assert!(payload.len() <= PAYLOAD_DUMP_LIMIT + 3);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(QaError::EmptyQuestion.code(), "empty_question");
        assert_eq!(QaError::NotFound("x".into()).code(), "not_found");
        assert_eq!(QaError::DuplicateId("x".into()).code(), "duplicate_id");
    }
}
