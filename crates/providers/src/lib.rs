//! External collaborators used by the assistant: weather, mandi prices, the
//! chat model and speech. Each concern is a trait so the orchestrator can be
//! exercised against fakes; the HTTP clients here are the production
//! implementations.

mod chat;
mod commodity;
mod config;
mod speech;
mod weather;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use mausam_core::{CommodityRecord, Language, WeatherSnapshot};

pub use chat::AnthropicChat;
pub use commodity::DataGovCommodityClient;
pub use config::{env_parse, env_string};
pub use speech::{GoogleSpeechToText, GoogleTextToSpeech};
pub use weather::OpenMeteoClient;

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub forecast_days: u8,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommodityQuery {
    pub state: Option<String>,
    pub district: Option<String>,
    pub date: Option<NaiveDate>,
    pub timeout: Duration,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<WeatherSnapshot>;
}

#[async_trait]
pub trait CommodityProvider: Send + Sync {
    async fn fetch_commodity_prices(&self, query: &CommodityQuery) -> Result<Vec<CommodityRecord>>;
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate_chat_reply(&self, prompt: &str, system_instructions: &str) -> Result<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech could not be understood")]
    Unintelligible,

    #[error("speech recognition service error: {0:#}")]
    Service(#[from] anyhow::Error),
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8], language: Language) -> Result<String, SpeechError>;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Returns MP3 bytes.
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>>;
}
