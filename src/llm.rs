//! Collaborator clients for text generation and embedding.
//!
//! The routing core never depends on a concrete model; it talks to the
//! narrow traits below. `OllamaClient` is the concrete implementation used
//! in deployment, with a bounded timeout on every call.

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Synchronous prompt-in, text-out generation. No streaming.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Text to embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Pairwise relevance scoring for reranking.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn score(&self, query: &str, candidate: &str) -> Result<f32>;
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Ollama HTTP client. One instance per model.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistantError::Collaborator(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    fn map_request_error(e: reqwest::Error, what: &str) -> AssistantError {
        if e.is_timeout() {
            AssistantError::Timeout(format!("{} call exceeded deadline", what))
        } else {
            AssistantError::Collaborator(format!("{} call failed: {}", what, e))
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating with model {}", self.model);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_request_error(e, "generator"))?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Collaborator(format!("malformed generator response: {}", e)))?;

        Ok(parsed.response.trim().to_string())
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text
        });

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_request_error(e, "embedder"))?;

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Collaborator(format!("malformed embedding response: {}", e)))?;

        Ok(parsed.embedding)
    }
}
