//! Text-generation collaborator
//!
//! Manifestos and debate digests are human-readable decoration. The
//! governance engine never reads generated text back into its numeric logic,
//! and every call site supplies a deterministic template that is used whenever
//! generation is disabled, fails, or returns blank output.

#![deny(unsafe_code)]

mod config;
mod http;

pub use config::{TextBackend, TextGenConfig};
pub use http::HttpTextGenerator;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Text-generation errors
#[derive(Debug, Error)]
pub enum TextGenError {
    /// Generation is switched off
    #[error("text generation disabled")]
    Disabled,

    /// Backend is missing required configuration
    #[error("backend not configured: {0}")]
    NotConfigured(String),

    /// Transport-level failure
    #[error("request failed: {0}")]
    Request(String),

    /// Backend answered with a non-success status
    #[error("backend error {status}: {body}")]
    Backend { status: u16, body: String },

    /// Backend answered with an unreadable body
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for text generation
pub type TextGenResult<T> = Result<T, TextGenError>;

/// Abstract `generate_text(prompt) -> string` collaborator
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> TextGenResult<String>;
}

/// Generator used when no backend is configured. Always declines, so callers
/// fall back to their template.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateGenerator;

#[async_trait]
impl TextGenerator for TemplateGenerator {
    async fn generate(&self, _prompt: &str) -> TextGenResult<String> {
        Err(TextGenError::Disabled)
    }
}

/// Generate text, substituting `template` on any failure or blank output
pub async fn generate_or_template(
    generator: &dyn TextGenerator,
    prompt: &str,
    template: impl FnOnce() -> String,
) -> String {
    match generator.generate(prompt).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            tracing::warn!("Text generation returned blank output, using template");
            template()
        }
        Err(TextGenError::Disabled) => template(),
        Err(err) => {
            tracing::warn!(error = %err, "Text generation failed, using template");
            template()
        }
    }
}

/// Build the generator described by `config`
pub fn build_generator(config: &TextGenConfig) -> TextGenResult<Arc<dyn TextGenerator>> {
    match config.backend {
        TextBackend::Disabled => Ok(Arc::new(TemplateGenerator)),
        TextBackend::Ollama | TextBackend::OpenAiCompatible => {
            Ok(Arc::new(HttpTextGenerator::new(config.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(TextGenResult<String>);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _prompt: &str) -> TextGenResult<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(TextGenError::Request("connection refused".into())),
            }
        }
    }

    #[tokio::test]
    async fn disabled_generator_yields_template() {
        let text = generate_or_template(&TemplateGenerator, "prompt", || "template".into()).await;
        assert_eq!(text, "template");
    }

    #[tokio::test]
    async fn failures_and_blank_output_yield_template() {
        let failing = Fixed(Err(TextGenError::Disabled));
        assert_eq!(
            generate_or_template(&failing, "p", || "fallback".into()).await,
            "fallback"
        );

        let blank = Fixed(Ok("   \n".into()));
        assert_eq!(
            generate_or_template(&blank, "p", || "fallback".into()).await,
            "fallback"
        );
    }

    #[tokio::test]
    async fn generated_text_is_trimmed() {
        let ok = Fixed(Ok("  I stand for clarity.\n".into()));
        assert_eq!(
            generate_or_template(&ok, "p", || "fallback".into()).await,
            "I stand for clarity."
        );
    }

    #[test]
    fn disabled_config_builds_template_generator() {
        assert!(build_generator(&TextGenConfig::default()).is_ok());
    }
}
