//! Generation capability and response-to-text normalization.
//!
//! Mirrors the embedding gateway's shape-matcher approach, with one
//! deliberate difference: on the answer path an imperfect answer beats a
//! hard failure, so normalization never errors. An unknown shape
//! degrades to a truncated dump of the raw payload.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{truncate_payload, QaError};

/// External generation capability: prompt in, raw provider JSON out.
///
/// Implemented by [`HttpGenerator`](crate::provider::HttpGenerator) in
/// production and by scripted mocks in tests.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    async fn generate_raw(&self, prompt: &str) -> Result<Value, QaError>;
}

/// Extract answer text from a generation response, trying known shapes
/// in order:
///
/// 1. text accessor field: `{"text": "..."}`
/// 2. a raw JSON string
/// 3. nested output path: `{"output": {"content": {"text": "..."}}}`
/// 4. chat-completion path: `choices[0].message.content`
///
/// Falls back to a truncated JSON dump when nothing matches.
pub fn normalize_generation_response(raw: &Value) -> String {
    if let Some(text) = raw.get("text").and_then(Value::as_str) {
        return text.to_string();
    }

    if let Some(text) = raw.as_str() {
        return text.to_string();
    }

    if let Some(text) = raw.pointer("/output/content/text").and_then(Value::as_str) {
        return text.to_string();
    }

    if let Some(text) = raw
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        return text.to_string();
    }

    truncate_payload(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_accessor_field() {
        let raw = json!({ "text": "the answer" });
        assert_eq!(normalize_generation_response(&raw), "the answer");
    }

    #[test]
    fn raw_string() {
        let raw = json!("just a string");
        assert_eq!(normalize_generation_response(&raw), "just a string");
    }

    #[test]
    fn nested_output_path() {
        let raw = json!({ "output": { "content": { "text": "nested" } } });
        assert_eq!(normalize_generation_response(&raw), "nested");
    }

    #[test]
    fn chat_completion_path() {
        let raw = json!({
            "choices": [ { "message": { "role": "assistant", "content": "from chat" } } ]
        });
        assert_eq!(normalize_generation_response(&raw), "from chat");
    }

    #[test]
    fn unknown_shape_falls_back_to_dump() {
        let raw = json!({ "surprise": 42 });
        let out = normalize_generation_response(&raw);
        assert!(out.contains("surprise"));
    }

    #[test]
    fn malformed_shape_never_panics_and_is_bounded() {
        let raw = json!({ "choices": "not an array", "filler": "z".repeat(5000) });
        let out = normalize_generation_response(&raw);
        assert!(out.len() < 1000);
    }
}
