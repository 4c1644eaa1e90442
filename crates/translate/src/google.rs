use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use mausam_core::Language;
use reqwest::Client;
use serde_json::Value;

use crate::Translator;

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";

/// Client for the public `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    http: Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(timeout)
            .build()
            .context("failed to build translation HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let base_url =
            env::var("MAUSAM_TRANSLATE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = Duration::from_secs(
            env::var("MAUSAM_TRANSLATE_TIMEOUT_SECONDS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(15),
        );
        Self::new(base_url, timeout)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", source.as_code()),
                ("tl", target.as_code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .context("translation request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("translation service returned {}", status.as_u16());
        }

        let body: Value = response
            .json()
            .await
            .context("translation response parse failed")?;
        extract_translation(&body).context("translation output missing")
    }
}

/// The endpoint answers with nested arrays; the first element holds one
/// `[translated, original, ...]` entry per sentence.
fn extract_translation(payload: &Value) -> Option<String> {
    let sentences = payload.get(0)?.as_array()?;
    let translated = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
        .collect::<String>();

    if translated.is_empty() {
        None
    } else {
        Some(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_sentence_fragments() {
        let payload = json!([
            [["नमस्ते। ", "Hello. ", null], ["आज बारिश होगी", "It will rain today", null]],
            null,
            "en"
        ]);
        assert_eq!(
            extract_translation(&payload).as_deref(),
            Some("नमस्ते। आज बारिश होगी")
        );
    }

    #[test]
    fn empty_payload_is_missing() {
        assert!(extract_translation(&json!([])).is_none());
        assert!(extract_translation(&json!([[]])).is_none());
    }
}
