//! OpenAI-compatible chat completion provider.
//!
//! Works against any endpoint that follows the OpenAI chat completions
//! API format, including local servers such as Ollama or vLLM.

use crate::core::config::LlmConfig;
use crate::core::llm::{ChatMessage, TextGenerator};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

pub struct OpenAiChatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatProvider {
    /// Creates a provider from configuration, reading the API key from
    /// the environment variable named in `config.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("Environment variable '{}' not set", config.api_key_env))?;
        Self::new_with_key(config, api_key)
    }

    /// Creates a provider with an explicitly provided API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    fn messages_to_json(messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_str(),
                    "content": msg.content,
                })
            })
            .collect()
    }

    fn request_body(&self, messages: &[ChatMessage], temperature: f64, stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": Self::messages_to_json(messages),
            "temperature": temperature,
            "stream": stream,
        })
    }

    /// Extracts the completion text from an OpenAI-format response.
    fn parse_response(body: &Value) -> Result<String> {
        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| anyhow!("No completion content in response"))?;
        Ok(content.to_string())
    }

    /// Parses a single SSE data line. Returns the parsed JSON if valid.
    fn parse_sse_line(line: &str) -> Option<Value> {
        let data = line.strip_prefix("data: ")?;
        if data == "[DONE]" {
            return None;
        }
        serde_json::from_str(data).ok()
    }

    async fn post(&self, body: &Value) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Chat completion request failed")?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .context("Failed to read chat completion response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Chat completion request failed with HTTP {status}: {response_body}"
            ));
        }

        Ok(response_body)
    }
}

#[async_trait]
impl TextGenerator for OpenAiChatProvider {
    async fn generate(&self, messages: &[ChatMessage], temperature: f64) -> Result<String> {
        let body = self.request_body(messages, temperature, false);
        let response_body = self.post(&body).await?;

        let json: Value = serde_json::from_str(&response_body)
            .context("Invalid JSON in chat completion response")?;
        Self::parse_response(&json)
    }

    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        tx: mpsc::Sender<String>,
    ) -> Result<()> {
        let body = self.request_body(messages, temperature, true);
        let response_body = self.post(&body).await?;

        for line in response_body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if line == "data: [DONE]" {
                break;
            }
            if let Some(data) = Self::parse_sse_line(line)
                && let Some(content) = data
                    .get("choices")
                    .and_then(|c| c.get(0))
                    .and_then(|choice| choice.get("delta"))
                    .and_then(|delta| delta.get("content"))
                    .and_then(|content| content.as_str())
                && !content.is_empty()
            {
                let _ = tx.send(content.to_string()).await;
            }
        }

        Ok(())
    }
}
