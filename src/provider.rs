//! HTTP-backed embedding and generation providers.
//!
//! Both speak OpenAI-style JSON endpoints and share one retry loop:
//! HTTP 429, 5xx, and network errors retry with exponential backoff
//! (1s, 2s, 4s, ... capped at 32s); other 4xx responses fail
//! immediately. API keys come from the environment, never from config
//! files.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::embedding::EmbeddingCapability;
use crate::error::QaError;
use crate::generation::GenerationCapability;

/// Embedding provider calling a `POST /v1/embeddings`-style endpoint.
pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpEmbedder {
    /// # Errors
    ///
    /// Fails when the configured API key environment variable is unset
    /// or the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, QaError> {
        let (api_key, client) = build_client(config)?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingCapability for HttpEmbedder {
    async fn embed_raw(&self, text: &str) -> Result<Value, QaError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        post_with_retry(
            &self.client,
            &self.endpoint,
            &self.api_key,
            &body,
            self.max_retries,
        )
        .await
    }
}

/// Generation provider calling a chat-completions-style endpoint.
pub struct HttpGenerator {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpGenerator {
    /// # Errors
    ///
    /// Fails when the configured API key environment variable is unset
    /// or the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, QaError> {
        let (api_key, client) = build_client(config)?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl GenerationCapability for HttpGenerator {
    async fn generate_raw(&self, prompt: &str) -> Result<Value, QaError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [ { "role": "user", "content": prompt } ],
        });
        post_with_retry(
            &self.client,
            &self.endpoint,
            &self.api_key,
            &body,
            self.max_retries,
        )
        .await
    }
}

fn build_client(config: &ProviderConfig) -> Result<(String, reqwest::Client), QaError> {
    let api_key = std::env::var(&config.api_key_env).map_err(|_| {
        QaError::ExternalCapability(format!(
            "{} environment variable not set",
            config.api_key_env
        ))
    })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| QaError::ExternalCapability(e.to_string()))?;

    Ok((api_key, client))
}

/// POST a JSON body with retry/backoff and return the raw JSON response.
async fn post_with_retry(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    body: &Value,
    max_retries: u32,
) -> Result<Value, QaError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(endpoint, attempt, "retrying provider call");
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json::<Value>().await.map_err(|e| {
                        QaError::ExternalCapability(format!(
                            "invalid JSON from {}: {}",
                            endpoint, e
                        ))
                    });
                }

                let body_text = response.text().await.unwrap_or_default();

                // Rate limited or server error: retry.
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(QaError::ExternalCapability(format!(
                        "{} returned {}: {}",
                        endpoint, status, body_text
                    )));
                    continue;
                }

                // Other client errors are not retryable.
                return Err(QaError::ExternalCapability(format!(
                    "{} returned {}: {}",
                    endpoint, status, body_text
                )));
            }
            Err(e) => {
                last_err = Some(QaError::ExternalCapability(format!(
                    "request to {} failed: {}",
                    endpoint, e
                )));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        QaError::ExternalCapability("provider call failed after retries".to_string())
    }))
}
