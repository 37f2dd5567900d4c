//! Access to the inference endpoint.
//!
//! [`InferenceClient`] is the seam the controller talks through;
//! [`OllamaGenerate`] implements it against Ollama's `/api/generate`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Failures of a single inference call.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The request never produced a response (refused, reset, DNS...).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered outside the 2xx range.
    #[error("inference endpoint returned HTTP {status}")]
    Status { status: u16 },
    /// A 2xx answer whose body is not JSON.
    #[error("malformed response body: {0}")]
    Malformed(String),
}

/// Something that turns a prompt into generated text.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Generate a reply for `prompt`.
    ///
    /// An empty string means the endpoint answered successfully without
    /// any reply text.
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Non-streaming client for Ollama's generate endpoint.
#[derive(Clone, Debug)]
pub struct OllamaGenerate {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaGenerate {
    /// Creates a client posting to the full endpoint `url`, e.g.
    /// `http://localhost:11434/api/generate`.
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url, model)
    }

    /// Creates a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        http: reqwest::Client,
        url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl InferenceClient for OllamaGenerate {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        trace!(target: "llm", url = %self.url, %prompt, "ollama prompt");
        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|source| InferenceError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|source| InferenceError::Transport {
                url: self.url.clone(),
                source,
            })?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| InferenceError::Malformed(e.to_string()))?;
        let reply = parsed.response.unwrap_or_default();
        debug!(target: "llm", response = %reply, "ollama full response");
        Ok(reply)
    }
}
