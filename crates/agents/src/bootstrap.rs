use std::sync::Arc;

use anyhow::{Context, Result};
use mausam_core::{Gazetteer, GazetteerProfile};
use mausam_observability::AppMetrics;
use mausam_providers::{
    env_string, AnthropicChat, DataGovCommodityClient, GoogleSpeechToText, GoogleTextToSpeech,
    OpenMeteoClient,
};
use mausam_translate::GoogleTranslator;
use serde::Serialize;
use tracing::{info, warn};

use crate::{AssistantSettings, Collaborators, WeatherAssistant};

/// Which key-gated services were configured at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub commodity_prices: bool,
    pub chat: bool,
    pub speech_to_text: bool,
}

pub fn gazetteer_from_env() -> Result<Gazetteer> {
    let name = env_string("MAUSAM_GAZETTEER").unwrap_or_else(|| "india".to_string());
    let profile = GazetteerProfile::parse(&name)
        .with_context(|| format!("unknown MAUSAM_GAZETTEER profile: {name}"))?;
    Gazetteer::load(profile)
}

impl Collaborators {
    /// Production HTTP clients configured from `MAUSAM_*` variables.
    pub fn from_env() -> Result<(Self, Capabilities)> {
        let commodity = DataGovCommodityClient::from_env()?;
        let chat = AnthropicChat::from_env()?;
        let speech = GoogleSpeechToText::from_env()?;

        let capabilities = Capabilities {
            commodity_prices: commodity.is_configured(),
            chat: chat.is_configured(),
            speech_to_text: speech.is_configured(),
        };

        let collaborators = Self {
            weather: Arc::new(OpenMeteoClient::from_env()?),
            commodity: Arc::new(commodity),
            chat: Arc::new(chat),
            translator: Arc::new(GoogleTranslator::from_env()?),
            speech_to_text: Arc::new(speech),
            text_to_speech: Arc::new(GoogleTextToSpeech::from_env()?),
        };
        Ok((collaborators, capabilities))
    }
}

impl WeatherAssistant {
    pub fn from_env(metrics: Arc<AppMetrics>) -> Result<(Self, Capabilities)> {
        let gazetteer = Arc::new(gazetteer_from_env()?);
        let (collaborators, capabilities) = Collaborators::from_env()?;

        if !capabilities.commodity_prices {
            warn!("MAUSAM_COMMODITY_API_KEY not set; commodity prices will be unavailable");
        }
        if !capabilities.chat {
            warn!("MAUSAM_CHAT_API_KEY not set; general chat will be unavailable");
        }
        info!(
            profile = gazetteer.profile(),
            regions = gazetteer.len(),
            "gazetteer loaded"
        );

        let assistant =
            WeatherAssistant::new(gazetteer, collaborators, AssistantSettings::from_env(), metrics);
        Ok((assistant, capabilities))
    }
}
