use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mausam_core::Language;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::{env_parse, env_string};
use crate::{SpeechError, SpeechToText, TextToSpeech};

const DEFAULT_SPEECH_BASE_URL: &str = "https://speech.googleapis.com";
const DEFAULT_TTS_BASE_URL: &str = "https://translate.google.com";
/// Longest text the TTS endpoint accepts per request.
const TTS_CHUNK_CHARS: usize = 200;

/// Google Cloud Speech-to-Text `speech:recognize` over REST.
#[derive(Debug, Clone)]
pub struct GoogleSpeechToText {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleSpeechToText {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(timeout)
            .build()
            .context("failed to build speech HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(
            env_string("MAUSAM_SPEECH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SPEECH_BASE_URL.to_string()),
            env_string("MAUSAM_SPEECH_API_KEY"),
            Duration::from_secs(env_parse("MAUSAM_SPEECH_TIMEOUT_SECONDS", 30)),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl SpeechToText for GoogleSpeechToText {
    async fn transcribe(&self, audio: &[u8], language: Language) -> Result<String, SpeechError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(anyhow!("MAUSAM_SPEECH_API_KEY is not configured").into());
        };
        if audio.is_empty() {
            return Err(SpeechError::Unintelligible);
        }

        let payload = json!({
            "config": { "languageCode": language.speech_locale() },
            "audio": { "content": STANDARD.encode(audio) }
        });

        let response = self
            .http
            .post(format!("{}/v1/speech:recognize", self.base_url))
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .context("speech recognition request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("speech service returned {}", status.as_u16()).into());
        }

        let body: Value = response
            .json()
            .await
            .context("speech recognition response parse failed")?;
        best_transcript(&body).ok_or(SpeechError::Unintelligible)
    }
}

/// Joins the top alternative of every result. No results means nothing
/// intelligible was heard.
fn best_transcript(payload: &Value) -> Option<String> {
    let transcript = payload
        .get("results")?
        .as_array()?
        .iter()
        .filter_map(|result| {
            result
                .get("alternatives")?
                .get(0)?
                .get("transcript")?
                .as_str()
        })
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if transcript.is_empty() {
        None
    } else {
        Some(transcript)
    }
}

/// The `translate_tts` endpoint used by Google Translate's speaker button.
#[derive(Debug, Clone)]
pub struct GoogleTextToSpeech {
    http: Client,
    base_url: String,
}

impl GoogleTextToSpeech {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(timeout)
            .build()
            .context("failed to build TTS HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(
            env_string("MAUSAM_TTS_BASE_URL").unwrap_or_else(|| DEFAULT_TTS_BASE_URL.to_string()),
            Duration::from_secs(env_parse("MAUSAM_TTS_TIMEOUT_SECONDS", 30)),
        )
    }
}

#[async_trait]
impl TextToSpeech for GoogleTextToSpeech {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>> {
        let chunks = speech_chunks(text, TTS_CHUNK_CHARS);
        if chunks.is_empty() {
            bail!("nothing to synthesize");
        }

        let total = chunks.len().to_string();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let response = self
                .http
                .get(format!("{}/translate_tts", self.base_url))
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language.as_code()),
                    ("q", chunk.as_str()),
                    ("idx", idx.as_str()),
                    ("total", total.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await
                .context("speech synthesis request failed")?;

            let status = response.status();
            if !status.is_success() {
                bail!("speech synthesis returned {}", status.as_u16());
            }
            let bytes = response
                .bytes()
                .await
                .context("speech synthesis body read failed")?;
            audio.extend_from_slice(&bytes);
        }

        Ok(audio)
    }
}

/// Packs whole words into chunks of at most `max_chars` characters. A single
/// word longer than the limit is split on character boundaries.
fn speech_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for word in text.split_whitespace() {
        let mut word_chars: Vec<char> = word.chars().collect();
        while word_chars.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            chunks.push(word_chars.drain(..max_chars).collect());
        }
        if word_chars.is_empty() {
            continue;
        }

        let needed = word_chars.len() + usize::from(!current.is_empty());
        if current_chars + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.extend(word_chars.iter());
        current_chars += word_chars.len();
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_uses_top_alternatives() {
        let payload = json!({
            "results": [
                { "alternatives": [{ "transcript": "weather in surat", "confidence": 0.93 }] },
                { "alternatives": [{ "transcript": " today " }, { "transcript": "to day" }] }
            ]
        });
        assert_eq!(
            best_transcript(&payload).as_deref(),
            Some("weather in surat today")
        );
    }

    #[test]
    fn empty_results_are_unintelligible() {
        assert!(best_transcript(&json!({})).is_none());
        assert!(best_transcript(&json!({ "results": [] })).is_none());
    }

    #[test]
    fn chunks_respect_word_boundaries() {
        let text = "Current weather in Surat, Gujarat: Temperature 31°C";
        let chunks = speech_chunks(text, 20);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 20));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn oversized_words_are_split() {
        let chunks = speech_chunks(&"x".repeat(450), 200);
        assert_eq!(
            chunks.iter().map(String::len).collect::<Vec<_>>(),
            vec![200, 200, 50]
        );
    }

    #[tokio::test]
    async fn unconfigured_recognizer_reports_service_error() {
        let stt = GoogleSpeechToText::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        let err = stt.transcribe(b"RIFF", Language::Hi).await.unwrap_err();
        assert!(matches!(err, SpeechError::Service(_)));
    }
}
