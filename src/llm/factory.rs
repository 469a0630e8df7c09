//! Classifier factory.
//!
//! The provider is selected exactly once at process start from
//! configuration; the rest of the system only sees the [`Classifier`]
//! trait.

use super::{
    AnthropicClassifier, BulkheadClassifier, BulkheadConfig, Classifier, LlmHttpConfig,
    OllamaClassifier, OpenAiClassifier,
};
use crate::config::{LlmConfig, LlmProviderKind};
use std::sync::Arc;

/// Builds the configured classifier, wrapped in the oracle bulkhead.
#[must_use]
pub fn build_classifier(llm_config: &LlmConfig) -> Arc<dyn Classifier> {
    let http_config = LlmHttpConfig::from_config(llm_config);

    let inner: Arc<dyn Classifier> = match llm_config.provider {
        LlmProviderKind::Anthropic => {
            let mut client = AnthropicClassifier::new();
            if let Some(ref api_key) = llm_config.api_key {
                client = client.with_api_key(api_key);
            }
            if let Some(ref model) = llm_config.model {
                client = client.with_model(model);
            }
            if let Some(ref base_url) = llm_config.base_url {
                client = client.with_endpoint(base_url);
            }
            Arc::new(client.with_http_config(http_config))
        },
        LlmProviderKind::OpenAi => {
            let mut client = OpenAiClassifier::new();
            if let Some(ref api_key) = llm_config.api_key {
                client = client.with_api_key(api_key);
            }
            if let Some(ref model) = llm_config.model {
                client = client.with_model(model);
            }
            if let Some(ref base_url) = llm_config.base_url {
                client = client.with_endpoint(base_url);
            }
            Arc::new(client.with_http_config(http_config))
        },
        LlmProviderKind::Ollama => {
            let mut client = OllamaClassifier::new();
            if let Some(ref model) = llm_config.model {
                client = client.with_model(model);
            }
            if let Some(ref base_url) = llm_config.base_url {
                client = client.with_endpoint(base_url);
            }
            Arc::new(client.with_http_config(http_config))
        },
    };

    Arc::new(BulkheadClassifier::new(
        inner,
        BulkheadConfig::from_config(llm_config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_configured_provider() {
        let config = LlmConfig {
            provider: LlmProviderKind::Ollama,
            ..LlmConfig::default()
        };
        let classifier = build_classifier(&config);
        assert_eq!(classifier.name(), "ollama");
    }

    #[test]
    fn test_default_provider_is_anthropic() {
        let classifier = build_classifier(&LlmConfig::default());
        assert_eq!(classifier.name(), "anthropic");
    }
}
