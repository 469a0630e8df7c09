//! Configuration management.

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration for corrlink.
#[derive(Debug, Clone)]
pub struct CorrlinkConfig {
    /// Path to the data directory holding the `SQLite` database.
    pub data_dir: PathBuf,
    /// Default number of documents pulled per resolution run.
    pub batch_size: usize,
    /// When set, probabilistic results never auto-apply regardless of
    /// confidence; everything except explicit codes goes to review.
    pub strict_review: bool,
    /// Maximum entities offered to the classifier as candidates.
    pub max_candidates: usize,
    /// LLM provider configuration.
    pub llm: LlmConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Provider name: "anthropic", "openai", "ollama".
    pub provider: LlmProviderKind,
    /// Model name.
    pub model: Option<String>,
    /// API key (can be an environment variable reference).
    pub api_key: Option<String>,
    /// Base URL for the provider (for self-hosted).
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Maximum concurrent classifier calls.
    pub max_concurrent: Option<usize>,
}

/// Available LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProviderKind {
    /// Anthropic Claude.
    #[default]
    Anthropic,
    /// `OpenAI` GPT.
    OpenAi,
    /// Ollama (local).
    Ollama,
}

impl LlmProviderKind {
    /// Parses a provider string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "openai" => Self::OpenAi,
            "ollama" => Self::Ollama,
            _ => Self::Anthropic,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Batch size.
    pub batch_size: Option<usize>,
    /// Strict human review mode.
    pub strict_review: Option<bool>,
    /// Maximum classifier candidates.
    pub max_candidates: Option<usize>,
    /// LLM configuration.
    pub llm: Option<ConfigFileLlm>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// Provider name.
    pub provider: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Maximum concurrent classifier calls.
    pub max_concurrent: Option<usize>,
}

impl Default for CorrlinkConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".corrlink"),
            batch_size: 50,
            strict_review: false,
            max_candidates: 20,
            llm: LlmConfig::default(),
        }
    }
}

impl CorrlinkConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir (`~/.config/corrlink/config.toml` on
    /// Unix) and falls back to defaults if no file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("corrlink").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `CorrlinkConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(batch_size) = file.batch_size {
            config.batch_size = batch_size.max(1);
        }
        if let Some(strict_review) = file.strict_review {
            config.strict_review = strict_review;
        }
        if let Some(max_candidates) = file.max_candidates {
            config.max_candidates = max_candidates.max(1);
        }
        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                config.llm.provider = LlmProviderKind::parse(&provider);
            }
            config.llm.model = llm.model;
            config.llm.api_key = llm.api_key;
            config.llm.base_url = llm.base_url;
            config.llm.timeout_ms = llm.timeout_ms;
            config.llm.connect_timeout_ms = llm.connect_timeout_ms;
            config.llm.max_concurrent = llm.max_concurrent;
        }

        config
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets strict human review mode.
    #[must_use]
    pub const fn with_strict_review(mut self, strict: bool) -> Self {
        self.strict_review = strict;
        self
    }

    /// Returns the database path inside the data directory.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("corrlink.db")
    }
}
