//! Blocking Ollama embedding client
//!
//! Talks to `POST {base_url}/api/embeddings` with `{model, prompt}` and reads
//! back `{embedding: [f32, ...]}`. The server URL travels with the client
//! value; there is no process-wide endpoint state.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::EmbeddingProvider;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Client for an Ollama-compatible embedding server
pub struct OllamaClient {
    http: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Build a client for the given server and model
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> EmbeddingResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbeddingError::Client(e.to_string()))?;
        let base_url = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Model name this client embeds with
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl EmbeddingProvider for OllamaClient {
    fn get_embedding(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        let embedding = parsed.embedding.ok_or_else(|| {
            EmbeddingError::InvalidResponse("response has no 'embedding' field".to_string())
        })?;
        if embedding.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }
        debug!(dimensions = embedding.len(), "embedding received");
        Ok(embedding)
    }

    fn is_server_available(&self) -> bool {
        self.http
            .get(format!("{}/", self.base_url))
            .send()
            .is_ok_and(|response| response.status().is_success())
    }
}
