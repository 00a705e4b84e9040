//! Text generation backends.
//!
//! The alignment pipeline only needs `generate(prompt, max_tokens)`.
//! Backends implement [`TextGenerator`]; [`build_generator`] picks one
//! from the model configuration.

mod anthropic;
mod ollama;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;

use crate::config::{ModelConfig, Provider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors from a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation backend unavailable: {0}")]
    Unavailable(String),

    #[error("Generation timed out after {0}s")]
    Timeout(u64),

    #[error("Generation API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode generation response: {0}")]
    Decode(String),
}

/// A language-model backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt`, capped at `max_tokens`.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError>;
}

/// Build the configured backend.
pub fn build_generator(config: &ModelConfig) -> Result<Arc<dyn TextGenerator>, GenerationError> {
    Ok(match config.provider {
        Provider::Anthropic => Arc::new(AnthropicClient::new(config)?),
        Provider::Ollama => Arc::new(OllamaClient::new(config)?),
    })
}

/// Map a transport error the way every backend reports it.
pub(crate) fn transport_error(e: reqwest::Error, url: &str) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Unavailable(format!("request to {} timed out", url))
    } else if e.is_connect() {
        GenerationError::Unavailable(format!("cannot connect to {}", url))
    } else {
        GenerationError::Unavailable(format!("failed to send request: {}", e))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_generator_per_provider() {
        let mut config = ModelConfig::default();
        let generator = build_generator(&config).unwrap();
        assert_eq!(generator.model_name(), "claude-3-sonnet-20240229");

        config.provider = Provider::Ollama;
        config.name = "llama3.2:latest".to_string();
        let generator = build_generator(&config).unwrap();
        assert_eq!(generator.model_name(), "llama3.2:latest");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GenerationError::Timeout(30).to_string(),
            "Generation timed out after 30s"
        );
        assert_eq!(
            GenerationError::Api {
                status: 429,
                body: "rate limited".to_string()
            }
            .to_string(),
            "Generation API error 429: rate limited"
        );
    }
}
