//! # docqa
//!
//! Retrieval-augmented question answering over uploaded documents.
//!
//! A client uploads a document; docqa extracts its text, splits it into
//! overlapping chunks, embeds each chunk via an external AI provider,
//! and persists everything. A question against a document is embedded,
//! matched against the stored chunks by cosine similarity, and answered
//! by an LLM prompted with the best matches plus recent conversation
//! history.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌──────────────────────┐   ┌───────────┐
//! │ Upload │──▶│ Extract→Chunk→Embed  │──▶│ Document  │
//! └────────┘   └──────────────────────┘   │ Store     │
//!                                         │ (JSON)    │
//! ┌──────────┐   ┌───────────────────┐    └─────┬─────┘
//! │ Question │──▶│ Embed→Rank→Prompt │◀─────────┘
//! └──────────┘   └─────────┬─────────┘
//!                          ▼
//!                    ┌──────────┐
//!                    │   LLM    │──▶ answer + history
//!                    └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Failure kinds for the upload and question paths |
//! | [`extract`] | Text extraction (PDF, DOCX, plain text) |
//! | [`chunk`] | Fixed-window text chunking |
//! | [`embedding`] | Embedding gateway and response normalization |
//! | [`generation`] | Generation capability and response normalization |
//! | [`provider`] | HTTP-backed providers with retry/backoff |
//! | [`rank`] | Cosine-similarity chunk ranking |
//! | [`store`] | Durable document store |
//! | [`ingest`] | Upload pipeline |
//! | [`answer`] | Retrieval-augmented answering |
//! | [`server`] | JSON HTTP server |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod provider;
pub mod rank;
pub mod server;
pub mod store;
