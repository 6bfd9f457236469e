use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: ProviderConfig,
    pub generation: ProviderConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Path of the JSON file the document store is mirrored into.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// How many top-ranked chunks feed the prompt.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// How many trailing history entries feed the prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            history_window: default_history_window(),
        }
    }
}

fn default_top_k() -> usize {
    4
}
fn default_history_window() -> usize {
    6
}

/// Settings for one external AI endpoint (embedding or generation).
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Full endpoint URL, e.g. `https://api.openai.com/v1/embeddings`.
    pub endpoint: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking: a zero step would never terminate.
    if config.chunking.size == 0 {
        anyhow::bail!("chunking.size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.size {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than chunking.size ({})",
            config.chunking.overlap,
            config.chunking.size
        );
    }

    // Validate retrieval
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.history_window == 0 {
        anyhow::bail!("retrieval.history_window must be >= 1");
    }

    for (section, provider) in [
        ("embedding", &config.embedding),
        ("generation", &config.generation),
    ] {
        if provider.endpoint.is_empty() {
            anyhow::bail!("{}.endpoint must not be empty", section);
        }
        if provider.model.is_empty() {
            anyhow::bail!("{}.model must not be empty", section);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(body: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("docqa.toml");
        std::fs::write(&path, body).unwrap();
        (tmp, path)
    }

    const MINIMAL: &str = r#"
[storage]
path = "./data/store.json"

[embedding]
endpoint = "https://api.openai.com/v1/embeddings"
model = "text-embedding-3-small"

[generation]
endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-4o-mini"

[server]
bind = "127.0.0.1:7878"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let (_tmp, path) = write_config(MINIMAL);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.chunking.size, 800);
        assert_eq!(cfg.chunking.overlap, 200);
        assert_eq!(cfg.retrieval.top_k, 4);
        assert_eq!(cfg.retrieval.history_window, 6);
        assert_eq!(cfg.embedding.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn degenerate_chunking_is_rejected() {
        let body = format!("{}\n[chunking]\nsize = 100\noverlap = 100\n", MINIMAL);
        let (_tmp, path) = write_config(&body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let body = format!("{}\n[retrieval]\ntop_k = 0\n", MINIMAL);
        let (_tmp, path) = write_config(&body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn zero_history_window_is_rejected() {
        let body = format!("{}\n[retrieval]\nhistory_window = 0\n", MINIMAL);
        let (_tmp, path) = write_config(&body);
        assert!(load_config(&path).is_err());
    }
}
