//! Ollama (local) classifier.

use super::{
    build_classification_prompt, build_http_client, parse_classification, Classification,
    Classifier, LlmHttpConfig,
};
use crate::models::{Document, Entity};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Ollama local classifier client.
pub struct OllamaClassifier {
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OllamaClassifier {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "llama3.2";

    /// Creates a new Ollama classifier.
    #[must_use]
    pub fn new() -> Self {
        let endpoint =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| Self::DEFAULT_ENDPOINT.to_string());
        let model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());

        Self {
            endpoint,
            model,
            client: build_http_client(LlmHttpConfig::default().with_env_overrides()),
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets HTTP client timeouts for LLM requests.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Checks if Ollama is reachable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.endpoint))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Makes a request to the Ollama generate API.
    fn request(&self, prompt: &str) -> Result<String> {
        tracing::info!(provider = "ollama", model = %self.model, "Making classifier request");

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .map_err(|e| Error::OperationFailed {
                operation: "ollama_request".to_string(),
                cause: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::OperationFailed {
                operation: "ollama_request".to_string(),
                cause: format!("API returned status: {status}"),
            });
        }

        let response: GenerateResponse = response.json().map_err(|e| Error::OperationFailed {
            operation: "ollama_response".to_string(),
            cause: e.to_string(),
        })?;

        Ok(response.response)
    }
}

impl Default for OllamaClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for OllamaClassifier {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn classify(
        &self,
        document: &Document,
        candidates: &[Entity],
    ) -> Result<Option<Classification>> {
        let prompt = build_classification_prompt(document, candidates);
        let response = self.request(&prompt)?;
        parse_classification(&response, candidates)
    }
}

/// Request to the generate API.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from the generate API.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
