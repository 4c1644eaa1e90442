use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::{env_parse, env_string};
use crate::ChatModel;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;

/// Anthropic Messages API. Without a key every call fails, which the
/// assistant reports as the chat service being unavailable.
#[derive(Debug, Clone)]
pub struct AnthropicChat {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl AnthropicChat {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(timeout)
            .build()
            .context("failed to build chat HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(
            env_string("MAUSAM_CHAT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            env_string("MAUSAM_CHAT_API_KEY"),
            env_string("MAUSAM_CHAT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            Duration::from_secs(env_parse("MAUSAM_CHAT_TIMEOUT_SECONDS", 30)),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ChatModel for AnthropicChat {
    async fn generate_chat_reply(&self, prompt: &str, system_instructions: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("MAUSAM_CHAT_API_KEY is not configured");
        };

        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "system": system_instructions,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .await
            .context("chat request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat service returned {}: {}", status.as_u16(), body);
        }

        let body: Value = response.json().await.context("chat response parse failed")?;
        extract_message_text(&body)
            .filter(|text| !text.trim().is_empty())
            .context("chat output missing")
    }
}

fn extract_message_text(payload: &Value) -> Option<String> {
    let blocks = payload.get("content")?.as_array()?;
    let text = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n\n");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
