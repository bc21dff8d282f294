//! Answer generation backends.
//!
//! Concrete implementations of [`folio_core::generation::Generator`]:
//! - **[`DisabledGenerator`]** — returns errors; used when generation is not configured.
//! - **[`OpenAIGenerator`]** — `POST /v1/chat/completions` with the prompt as a single user message.
//! - **[`OllamaGenerator`]** — `POST /api/generate` on a local Ollama instance.
//!
//! Every request is bounded by `max_new_tokens` and uses the same retry
//! policy as the embedding backends.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use folio_core::generation::Generator;

use crate::config::GenerationConfig;
use crate::http;

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("Generation provider is disabled; set [generation] provider in the config")
    }
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    model: String,
    api_key: String,
    max_new_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model,
            api_key,
            max_new_tokens: config.max_new_tokens,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.max_new_tokens,
        });
        let json = http::post_json(
            &self.client,
            "https://api.openai.com/v1/chat/completions",
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        let answer = parse_openai_completion(&json)?;
        debug!(model = %self.model, chars = answer.len(), "generated via OpenAI");
        Ok(answer)
    }
}

fn parse_openai_completion(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

// ============ Ollama ============

pub struct OllamaGenerator {
    model: String,
    url: String,
    max_new_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model,
            url,
            max_new_tokens: config.max_new_tokens,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": self.max_new_tokens },
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/api/generate", self.url),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        let answer = parse_ollama_completion(&json)?;
        debug!(model = %self.model, chars = answer.len(), "generated via Ollama");
        Ok(answer)
    }
}

fn parse_ollama_completion(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|r| r.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}

/// Create the configured [`Generator`].
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_completion() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": " Paris.\n" } }]
        });
        assert_eq!(parse_openai_completion(&json).unwrap(), "Paris.");
        assert!(parse_openai_completion(&serde_json::json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_parse_ollama_completion() {
        let json = serde_json::json!({ "model": "llama3.2", "response": "Paris", "done": true });
        assert_eq!(parse_ollama_completion(&json).unwrap(), "Paris");
        assert!(parse_ollama_completion(&serde_json::json!({ "done": true })).is_err());
    }

    #[test]
    fn test_ollama_generator_defaults_url() {
        let config = GenerationConfig {
            provider: "ollama".into(),
            model: Some("llama3.2".into()),
            ..Default::default()
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        assert_eq!(generator.url, "http://localhost:11434");
        assert_eq!(generator.model_name(), "llama3.2");
    }

    #[tokio::test]
    async fn test_disabled_generator_refuses() {
        let generator = create_generator(&GenerationConfig::default()).unwrap();
        assert!(generator.generate("prompt").await.is_err());
    }
}
