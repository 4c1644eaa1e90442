use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::AssistantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Weather,
    CommodityPrice,
    Chat,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::CommodityPrice => "commodity_price",
            Self::Chat => "chat",
        }
    }
}

/// Languages the assistant can answer in. Content is always produced in
/// English first and translated outbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    En,
    Hi,
    Ta,
    Te,
    Kn,
    Ml,
    Mr,
    Gu,
    Bn,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Self::En,
        Self::Hi,
        Self::Ta,
        Self::Te,
        Self::Kn,
        Self::Ml,
        Self::Mr,
        Self::Gu,
        Self::Bn,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "en" | "en-in" | "english" => Some(Self::En),
            "hi" | "hi-in" | "hindi" => Some(Self::Hi),
            "ta" | "ta-in" | "tamil" => Some(Self::Ta),
            "te" | "te-in" | "telugu" => Some(Self::Te),
            "kn" | "kn-in" | "kannada" => Some(Self::Kn),
            "ml" | "ml-in" | "malayalam" => Some(Self::Ml),
            "mr" | "mr-in" | "marathi" => Some(Self::Mr),
            "gu" | "gu-in" | "gujarati" => Some(Self::Gu),
            "bn" | "bn-in" | "bengali" => Some(Self::Bn),
            _ => None,
        }
    }

    /// Missing or blank codes default to English; anything else must be known.
    pub fn from_optional_str(value: Option<&str>) -> Result<Self, AssistantError> {
        match value.map(str::trim).filter(|value| !value.is_empty()) {
            None => Ok(Self::En),
            Some(code) => {
                Self::parse(code).ok_or_else(|| AssistantError::UnsupportedLanguage(code.to_string()))
            }
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Ta => "ta",
            Self::Te => "te",
            Self::Kn => "kn",
            Self::Ml => "ml",
            Self::Mr => "mr",
            Self::Gu => "gu",
            Self::Bn => "bn",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
            Self::Ta => "Tamil",
            Self::Te => "Telugu",
            Self::Kn => "Kannada",
            Self::Ml => "Malayalam",
            Self::Mr => "Marathi",
            Self::Gu => "Gujarati",
            Self::Bn => "Bengali",
        }
    }

    /// BCP-47 tag handed to the speech recognizer.
    pub fn speech_locale(self) -> &'static str {
        match self {
            Self::En => "en-IN",
            Self::Hi => "hi-IN",
            Self::Ta => "ta-IN",
            Self::Te => "te-IN",
            Self::Kn => "kn-IN",
            Self::Ml => "ml-IN",
            Self::Mr => "mr-IN",
            Self::Gu => "gu-IN",
            Self::Bn => "bn-IN",
        }
    }

    pub fn is_english(self) -> bool {
        self == Self::En
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub parent: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Region {
    pub fn label(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}, {}", self.name, parent),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub raw_text: String,
    pub language: Language,
    pub conversation_context: Option<String>,
}

impl RequestContext {
    pub fn new(raw_text: impl Into<String>, language: Language) -> Self {
        Self {
            raw_text: raw_text.into(),
            language,
            conversation_context: None,
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.conversation_context = context.filter(|value| !value.trim().is_empty());
        self
    }
}

/// Open-Meteo forecast document. Every field is optional; formatters treat
/// absence as "N/A".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(default)]
    pub current: CurrentConditions,
    #[serde(default)]
    pub hourly: HourlySeries,
    #[serde(default)]
    pub daily: DailySeries,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub temperature_2m: Option<f64>,
    #[serde(default)]
    pub relative_humidity_2m: Option<f64>,
    #[serde(default)]
    pub apparent_temperature: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<u16>,
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
    #[serde(default)]
    pub wind_direction_10m: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<u16>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub weather_code: Vec<Option<u16>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub apparent_temperature_max: Vec<Option<f64>>,
    #[serde(default)]
    pub apparent_temperature_min: Vec<Option<f64>>,
    #[serde(default)]
    pub sunrise: Vec<Option<String>>,
    #[serde(default)]
    pub sunset: Vec<Option<String>>,
    #[serde(default)]
    pub precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m_max: Vec<Option<f64>>,
}

/// One mandi price row as published by data.gov.in. Prices are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityRecord {
    #[serde(rename = "Commodity", default = "not_available", deserialize_with = "lenient_string")]
    pub commodity: String,
    #[serde(rename = "Variety", default = "not_available", deserialize_with = "lenient_string")]
    pub variety: String,
    #[serde(rename = "Market", default = "not_available", deserialize_with = "lenient_string")]
    pub market: String,
    #[serde(rename = "Min_Price", default = "not_available", deserialize_with = "lenient_string")]
    pub min_price: String,
    #[serde(rename = "Max_Price", default = "not_available", deserialize_with = "lenient_string")]
    pub max_price: String,
    #[serde(rename = "Modal_Price", default = "not_available", deserialize_with = "lenient_string")]
    pub modal_price: String,
    #[serde(rename = "State", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "District", default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(rename = "Arrival_Date", default, skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<String>,
}

fn not_available() -> String {
    "N/A".to_string()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Null => "N/A".to_string(),
        other => other.to_string(),
    })
}

/// Outcome of a step that may degrade instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftResult<T> {
    Value(T),
    Fallback { value: T, reason: String },
}

impl<T> SoftResult<T> {
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Self::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Value(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Value(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Value(_) => None,
            Self::Fallback { reason, .. } => Some(reason.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    pub request_id: String,
    pub intent: Intent,
    pub text: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<CommodityRecord>>,
    pub translation_degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceReply {
    pub recognized_text: String,
    pub reply: AssistantReply,
    #[serde(skip)]
    pub audio: Option<Vec<u8>>,
    pub audio_format: String,
    pub synthesis_degraded: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionSelector {
    pub state: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRequest {
    pub region: RegionSelector,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityRequest {
    pub region: RegionSelector,
    pub date: Option<NaiveDate>,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub language: Language,
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_defaults_to_english() {
        assert_eq!(Language::from_optional_str(None).unwrap(), Language::En);
        assert_eq!(Language::from_optional_str(Some("  ")).unwrap(), Language::En);
        assert_eq!(Language::from_optional_str(Some("Gujarati")).unwrap(), Language::Gu);
    }

    #[test]
    fn unknown_language_is_rejected() {
        let err = Language::from_optional_str(Some("xx")).unwrap_err();
        assert!(matches!(err, AssistantError::UnsupportedLanguage(code) if code == "xx"));
    }

    #[test]
    fn commodity_record_accepts_numeric_prices() {
        let record: CommodityRecord = serde_json::from_value(serde_json::json!({
            "Commodity": "Onion",
            "Variety": "Red",
            "Market": "Surat",
            "Min_Price": 1200,
            "Max_Price": "1800",
            "Modal_Price": null
        }))
        .unwrap();

        assert_eq!(record.min_price, "1200");
        assert_eq!(record.max_price, "1800");
        assert_eq!(record.modal_price, "N/A");
        assert!(record.state.is_none());
    }

    #[test]
    fn snapshot_tolerates_missing_blocks() {
        let snapshot: WeatherSnapshot =
            serde_json::from_str(r#"{"current":{"temperature_2m":31.5}}"#).unwrap();
        assert_eq!(snapshot.current.temperature_2m, Some(31.5));
        assert!(snapshot.daily.time.is_empty());
    }
}
