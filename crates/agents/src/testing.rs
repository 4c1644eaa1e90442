//! In-memory collaborators for exercising the assistant without network
//! access. Enabled for this crate's tests and through the `test-support`
//! feature for downstream test crates.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mausam_core::{
    CommodityRecord, CurrentConditions, DailySeries, Gazetteer, GazetteerProfile, Language,
    WeatherSnapshot,
};
use mausam_observability::AppMetrics;
use mausam_providers::{
    ChatModel, CommodityProvider, CommodityQuery, SpeechError, SpeechToText, TextToSpeech,
    WeatherProvider, WeatherQuery,
};
use mausam_translate::Translator;
use parking_lot::Mutex;

use crate::{AssistantSettings, Collaborators, WeatherAssistant};

pub const FAKE_AUDIO: &[u8] = b"ID3-fake-mp3";

/// Snapshot with a given current temperature and clear skies.
pub fn snapshot_with_temperature(temperature: f64) -> WeatherSnapshot {
    WeatherSnapshot {
        current: CurrentConditions {
            temperature_2m: Some(temperature),
            relative_humidity_2m: Some(40.0),
            apparent_temperature: Some(temperature + 2.0),
            precipitation: Some(0.0),
            weather_code: Some(0),
            wind_speed_10m: Some(9.0),
            wind_direction_10m: Some(270.0),
        },
        daily: DailySeries {
            time: vec!["2024-05-01".into(), "2024-05-02".into()],
            weather_code: vec![Some(0), Some(1)],
            temperature_2m_max: vec![Some(temperature + 3.0), Some(temperature + 2.0)],
            temperature_2m_min: vec![Some(temperature - 8.0), Some(temperature - 7.0)],
            precipitation_sum: vec![Some(0.0), Some(0.0)],
            precipitation_probability_max: vec![Some(5.0), Some(10.0)],
            ..DailySeries::default()
        },
        ..WeatherSnapshot::default()
    }
}

pub fn sample_records(count: usize) -> Vec<CommodityRecord> {
    const CROPS: [&str; 8] = [
        "Onion", "Potato", "Tomato", "Wheat", "Cotton", "Groundnut", "Bajra", "Cumin",
    ];
    (0..count)
        .map(|idx| CommodityRecord {
            commodity: CROPS[idx % CROPS.len()].to_string(),
            variety: "Local".to_string(),
            market: "Rajkot".to_string(),
            min_price: (1000 + idx * 100).to_string(),
            max_price: (1600 + idx * 100).to_string(),
            modal_price: (1300 + idx * 100).to_string(),
            state: Some("Gujarat".to_string()),
            district: Some("Rajkot".to_string()),
            arrival_date: None,
        })
        .collect()
}

pub struct FakeWeather {
    snapshot: WeatherSnapshot,
    delay: Option<Duration>,
    fail: bool,
    pub queries: Mutex<Vec<WeatherQuery>>,
}

impl FakeWeather {
    pub fn returning(snapshot: WeatherSnapshot) -> Self {
        Self {
            snapshot,
            delay: None,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(WeatherSnapshot::default())
        }
    }

    pub fn slow(snapshot: WeatherSnapshot, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(snapshot)
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<WeatherSnapshot> {
        self.queries.lock().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(anyhow!("open-meteo returned 503 from 10.1.2.3"));
        }
        Ok(self.snapshot.clone())
    }
}

pub struct FakeCommodity {
    records: Vec<CommodityRecord>,
    fail: bool,
    pub queries: Mutex<Vec<CommodityQuery>>,
}

impl FakeCommodity {
    pub fn returning(records: Vec<CommodityRecord>) -> Self {
        Self {
            records,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(Vec::new())
        }
    }

    pub fn last_query(&self) -> Option<CommodityQuery> {
        self.queries.lock().last().cloned()
    }
}

#[async_trait]
impl CommodityProvider for FakeCommodity {
    async fn fetch_commodity_prices(&self, query: &CommodityQuery) -> Result<Vec<CommodityRecord>> {
        self.queries.lock().push(query.clone());
        if self.fail {
            return Err(anyhow!("data.gov.in rejected the api key"));
        }
        Ok(self.records.clone())
    }
}

pub struct FakeChat {
    reply: String,
    fail: bool,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl FakeChat {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying("")
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().map(|(prompt, _)| prompt.clone())
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn generate_chat_reply(&self, prompt: &str, system_instructions: &str) -> Result<String> {
        self.prompts
            .lock()
            .push((prompt.to_string(), system_instructions.to_string()));
        if self.fail {
            return Err(anyhow!("overloaded_error"));
        }
        Ok(self.reply.clone())
    }
}

/// Tags text with the target code, e.g. `[hi] Hello`.
#[derive(Default)]
pub struct FakeTranslator {
    fail: bool,
    pub calls: Mutex<Vec<(String, Language, Language)>>,
}

impl FakeTranslator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Language, Language)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        self.calls.lock().push((text.to_string(), source, target));
        if self.fail {
            return Err(anyhow!("translation quota exceeded"));
        }
        Ok(format!("[{}] {}", target.as_code(), text))
    }
}

#[derive(Debug, Clone)]
pub enum SpeechOutcome {
    Transcript(String),
    Unintelligible,
    ServiceError,
}

pub struct FakeSpeech {
    outcome: SpeechOutcome,
    pub hints: Mutex<Vec<Language>>,
}

impl FakeSpeech {
    pub fn new(outcome: SpeechOutcome) -> Self {
        Self {
            outcome,
            hints: Mutex::new(Vec::new()),
        }
    }

    pub fn hearing(text: impl Into<String>) -> Self {
        Self::new(SpeechOutcome::Transcript(text.into()))
    }
}

#[async_trait]
impl SpeechToText for FakeSpeech {
    async fn transcribe(&self, _audio: &[u8], language: Language) -> Result<String, SpeechError> {
        self.hints.lock().push(language);
        match &self.outcome {
            SpeechOutcome::Transcript(text) => Ok(text.clone()),
            SpeechOutcome::Unintelligible => Err(SpeechError::Unintelligible),
            SpeechOutcome::ServiceError => Err(anyhow!("recognizer unavailable").into()),
        }
    }
}

#[derive(Default)]
pub struct FakeTts {
    fail: bool,
    pub requests: Mutex<Vec<(String, Language)>>,
}

impl FakeTts {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl TextToSpeech for FakeTts {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>> {
        self.requests.lock().push((text.to_string(), language));
        if self.fail {
            return Err(anyhow!("tts endpoint returned 429"));
        }
        Ok(FAKE_AUDIO.to_vec())
    }
}

/// One fake per collaborator, kept as `Arc`s so tests can inspect calls after
/// handing them to the assistant.
pub struct Fakes {
    pub weather: Arc<FakeWeather>,
    pub commodity: Arc<FakeCommodity>,
    pub chat: Arc<FakeChat>,
    pub translator: Arc<FakeTranslator>,
    pub speech: Arc<FakeSpeech>,
    pub tts: Arc<FakeTts>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            weather: Arc::new(FakeWeather::returning(snapshot_with_temperature(28.0))),
            commodity: Arc::new(FakeCommodity::returning(sample_records(3))),
            chat: Arc::new(FakeChat::replying("Monsoon reaches Kerala in early June.")),
            translator: Arc::new(FakeTranslator::default()),
            speech: Arc::new(FakeSpeech::hearing("weather in Surat")),
            tts: Arc::new(FakeTts::default()),
        }
    }
}

impl Fakes {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            weather: self.weather.clone(),
            commodity: self.commodity.clone(),
            chat: self.chat.clone(),
            translator: self.translator.clone(),
            speech_to_text: self.speech.clone(),
            text_to_speech: self.tts.clone(),
        }
    }

    pub fn settings() -> AssistantSettings {
        AssistantSettings {
            fetch_timeout: Duration::from_millis(200),
            ..AssistantSettings::default()
        }
    }

    pub fn assistant(&self, profile: GazetteerProfile) -> Result<WeatherAssistant> {
        Ok(WeatherAssistant::new(
            Arc::new(Gazetteer::load(profile)?),
            self.collaborators(),
            Self::settings(),
            AppMetrics::shared(),
        ))
    }
}
