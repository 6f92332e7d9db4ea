//! HTTP text-generation backends.

use crate::{TextBackend, TextGenConfig, TextGenError, TextGenResult, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_OLLAMA_ENDPOINT: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const ERROR_BODY_LIMIT: usize = 320;

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

/// Generator backed by an Ollama or OpenAI-compatible HTTP endpoint
pub struct HttpTextGenerator {
    client: Client,
    config: TextGenConfig,
}

impl HttpTextGenerator {
    pub fn new(config: TextGenConfig) -> TextGenResult<Self> {
        if config.backend == TextBackend::OpenAiCompatible && config.api_key.is_none() {
            return Err(TextGenError::NotConfigured(
                "openai_compatible backend requires api_key".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .no_proxy()
            .build()
            .map_err(|e| TextGenError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn generate_ollama(&self, prompt: &str) -> TextGenResult<String> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_ENDPOINT);
        let url = format!("{}/api/generate", endpoint.trim_end_matches('/'));

        let mut options = serde_json::Map::new();
        options.insert("num_predict".to_string(), json!(self.config.max_tokens));
        if let Some(temp) = self.config.temperature {
            options.insert("temperature".to_string(), json!(temp));
        }
        let payload = json!({
            "model": self.config.model,
            "prompt": prompt.trim(),
            "stream": false,
            "options": Value::Object(options),
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TextGenError::Request(format!("ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TextGenError::Backend {
                status,
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| TextGenError::InvalidResponse(e.to_string()))?;
        Ok(body.response.trim().to_string())
    }

    async fn generate_openai(&self, prompt: &str) -> TextGenResult<String> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            TextGenError::NotConfigured("openai_compatible backend requires api_key".to_string())
        })?;
        let url = self
            .config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_ENDPOINT);

        let mut payload = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.config.max_tokens,
        });
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TextGenError::Request(format!("chat request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TextGenError::Backend {
                status,
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let body: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| TextGenError::InvalidResponse(e.to_string()))?;
        let choice = body.choices.first().ok_or_else(|| {
            TextGenError::InvalidResponse("response did not include choices".to_string())
        })?;
        Ok(extract_text(&choice.message.content))
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> TextGenResult<String> {
        match self.config.backend {
            TextBackend::Disabled => Err(TextGenError::Disabled),
            TextBackend::Ollama => self.generate_ollama(prompt).await,
            TextBackend::OpenAiCompatible => self.generate_openai(prompt).await,
        }
    }
}

/// Chat content may be a plain string or an array of typed parts
fn extract_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.trim().to_string(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string(),
        _ => String::new(),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out = value.chars().take(max_chars).collect::<String>();
    out.push_str("...");
    out
}
