//! Text-generation backend configuration

use serde::{Deserialize, Serialize};

/// Which backend serves generation requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextBackend {
    /// No backend; templates only
    #[default]
    Disabled,
    /// Local Ollama server (`/api/generate`)
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAiCompatible,
}

/// Text-generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextGenConfig {
    #[serde(default)]
    pub backend: TextBackend,

    /// Base URL (Ollama) or full chat-completions URL (OpenAI-compatible)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for TextGenConfig {
    fn default() -> Self {
        Self {
            backend: TextBackend::Disabled,
            endpoint: None,
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    256
}
