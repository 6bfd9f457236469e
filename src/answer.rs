//! Retrieval-augmented answering.
//!
//! Turns a question against an uploaded document into a grounded LLM
//! call: embed the question, rank the document's chunks by cosine
//! similarity, assemble a prompt from the top matches plus the trailing
//! conversation history, submit it, and record the exchange.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingGateway;
use crate::error::QaError;
use crate::generation::{normalize_generation_response, GenerationCapability};
use crate::models::HistoryEntry;
use crate::rank::rank_chunks;
use crate::store::DocumentStore;

/// Separator line placed between ranked excerpts in the prompt.
const EXCERPT_SEPARATOR: &str = "---";
/// Marker used when a document has no conversation history yet.
const NO_HISTORY_MARKER: &str = "(no prior conversation)";

/// Result of one question: the answer plus the document's updated history.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub answer: String,
    pub history: Vec<HistoryEntry>,
}

/// Orchestrates retrieval, prompt assembly, generation, and history.
pub struct Answerer {
    store: Arc<DocumentStore>,
    embeddings: Arc<EmbeddingGateway>,
    generator: Box<dyn GenerationCapability>,
    top_k: usize,
    history_window: usize,
}

impl Answerer {
    pub fn new(
        store: Arc<DocumentStore>,
        embeddings: Arc<EmbeddingGateway>,
        generator: Box<dyn GenerationCapability>,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embeddings,
            generator,
            top_k: retrieval.top_k,
            history_window: retrieval.history_window,
        }
    }

    /// Answer `question` against the document `document_id`.
    ///
    /// # Errors
    ///
    /// `EmptyQuestion` for a blank question and `NotFound` for an unknown
    /// id, both checked before any external call is made. Embedding and
    /// generation call failures propagate; a malformed generation
    /// *response shape* does not (it degrades to a textual fallback).
    /// A history persistence failure is fatal to the request.
    pub async fn answer(
        &self,
        document_id: &str,
        question: &str,
    ) -> Result<AnswerOutcome, QaError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::EmptyQuestion);
        }
        let document = self.store.get(document_id)?;

        let query = self.embeddings.embed(question).await?;
        let ranked = rank_chunks(&query, &document.chunks);
        let excerpts: Vec<&str> = ranked.iter().take(self.top_k).map(|r| r.text).collect();

        let prompt = build_prompt(&excerpts, &document.history, self.history_window, question);
        tracing::debug!(
            document = document_id,
            excerpts = excerpts.len(),
            prompt_chars = prompt.len(),
            "submitting grounded prompt"
        );

        let raw = self.generator.generate_raw(&prompt).await?;
        let answer = normalize_generation_response(&raw);

        self.store.append_history(
            document_id,
            HistoryEntry {
                question: question.to_string(),
                answer: answer.clone(),
                created_at: Utc::now(),
            },
        )?;

        let history = self.store.get(document_id)?.history;
        Ok(AnswerOutcome { answer, history })
    }
}

/// Assemble the grounded prompt: instructions, ranked excerpts, recent
/// history, then the literal question.
pub fn build_prompt(
    excerpts: &[&str],
    history: &[HistoryEntry],
    window: usize,
    question: &str,
) -> String {
    let context = if excerpts.is_empty() {
        "(no excerpts)".to_string()
    } else {
        excerpts.join(&format!("\n{}\n", EXCERPT_SEPARATOR))
    };

    format!(
        "You are answering questions about an uploaded document.\n\
         Answer using only the excerpts and the prior conversation below.\n\
         If they do not contain the answer, say you are not sure instead of inventing facts.\n\
         \n\
         Excerpts:\n{}\n\
         \n\
         Conversation so far:\n{}\n\
         \n\
         Question: {}",
        context,
        render_history(history, window),
        question
    )
}

/// Render the most recent `window` history entries as alternating Q/A
/// pairs, oldest of that window first. An empty history renders as an
/// explicit marker rather than an empty section.
pub fn render_history(history: &[HistoryEntry], window: usize) -> String {
    if history.is_empty() {
        return NO_HISTORY_MARKER.to_string();
    }
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .map(|e| format!("Q: {}\nA: {}", e.question, e.answer))
        .collect::<Vec<_>>()
        .join("\n")
}
