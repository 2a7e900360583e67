//! Image captions from an Ollama server.
//!
//! Sends the image base64-encoded to `/api/generate` with a short
//! instruction and returns the model's reply as the caption.

use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CaptionConfig;
use crate::error::{ModelError, ModelResult};
use crate::Captioner;

const PROVIDER: &str = "ollama";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Captioner backed by an Ollama vision-language model.
#[derive(Debug)]
pub struct OllamaCaptioner {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    prompt: String,
}

impl OllamaCaptioner {
    /// Create a captioner. No request is made until the first caption.
    pub fn new(config: &CaptionConfig) -> ModelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::ProviderNotAvailable {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            prompt: config.prompt.clone(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, bytes: &[u8]) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt: &self.prompt,
            images: vec![base64::engine::general_purpose::STANDARD.encode(bytes)],
            stream: false,
        }
    }
}

impl Captioner for OllamaCaptioner {
    fn caption(&self, bytes: &[u8]) -> ModelResult<String> {
        let url = self.generate_url();
        debug!("Requesting caption from {} (model={})", url, self.model);

        let response = self
            .client
            .post(&url)
            .json(&self.request(bytes))
            .send()
            .map_err(|e| ModelError::caption_failed(PROVIDER, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::caption_failed(
                PROVIDER,
                format!("{} returned HTTP {}", url, status),
            ));
        }

        let body: GenerateResponse = response
            .json()
            .map_err(|e| ModelError::caption_failed(PROVIDER, e.to_string()))?;

        let caption = body.response.trim().to_string();
        if caption.is_empty() {
            return Err(ModelError::caption_failed(PROVIDER, "empty caption"));
        }
        Ok(caption)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
