mod bootstrap;
mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use chrono::NaiveDate;
use mausam_core::{
    classify, extract_date, extract_region, format_commodity, format_weather, normalize_text,
    AssistantError, AssistantReply, ChatRequest, CommodityRecord, CommodityRequest, ErrorKind,
    Gazetteer, Intent, Language, Region, RegionSelector, RequestContext, SoftResult, VoiceReply,
    WeatherRequest,
};
use mausam_observability::{AppMetrics, Outcome};
use mausam_providers::{
    ChatModel, CommodityProvider, CommodityQuery, SpeechError, SpeechToText, TextToSpeech,
    WeatherProvider, WeatherQuery,
};
use mausam_translate::{TranslationAdapter, Translator};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub use bootstrap::{gazetteer_from_env, Capabilities};
pub use settings::{AssistantSettings, DEFAULT_SYSTEM_PROMPT};

pub const AUDIO_FORMAT: &str = "mp3";

/// Everything the assistant talks to over the network.
#[derive(Clone)]
pub struct Collaborators {
    pub weather: Arc<dyn WeatherProvider>,
    pub commodity: Arc<dyn CommodityProvider>,
    pub chat: Arc<dyn ChatModel>,
    pub translator: Arc<dyn Translator>,
    pub speech_to_text: Arc<dyn SpeechToText>,
    pub text_to_speech: Arc<dyn TextToSpeech>,
}

#[derive(Debug, Clone)]
pub struct VoiceRequest {
    pub audio: Vec<u8>,
    pub language: Language,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionListing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub names: Vec<String>,
}

/// Request orchestrator: classify, resolve the region, fetch, format, then
/// translate into the caller's language.
#[derive(Clone)]
pub struct WeatherAssistant {
    gazetteer: Arc<Gazetteer>,
    collaborators: Collaborators,
    translation: TranslationAdapter,
    settings: AssistantSettings,
    metrics: Arc<AppMetrics>,
}

impl WeatherAssistant {
    pub fn new(
        gazetteer: Arc<Gazetteer>,
        collaborators: Collaborators,
        mut settings: AssistantSettings,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        if settings.default_commodity_state.is_none() && gazetteer.is_single_parent() {
            settings.default_commodity_state = gazetteer.parents().first().cloned();
        }

        Self {
            translation: TranslationAdapter::new(collaborators.translator.clone()),
            gazetteer,
            collaborators,
            settings,
            metrics,
        }
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    /// Free-text entry point shared by chat, the text API and voice.
    #[instrument(skip(self, ctx), fields(language = ctx.language.as_code()))]
    pub async fn handle_text(&self, ctx: RequestContext) -> Result<AssistantReply, AssistantError> {
        let started = Instant::now();
        self.metrics.inc_request();
        let result = self.dispatch_text(ctx).await;
        self.finish(started, result)
    }

    #[instrument(skip(self, request), fields(language = request.language.as_code()))]
    pub async fn weather(&self, request: WeatherRequest) -> Result<AssistantReply, AssistantError> {
        let started = Instant::now();
        self.metrics.inc_request();
        self.metrics.inc_intent(Intent::Weather.as_str());

        let result = match self.resolve_selected(&request.region, "weather") {
            Ok(region) => self.weather_reply(region, request.language).await,
            Err(err) => Err(err),
        };
        self.finish(started, result)
    }

    #[instrument(skip(self, request), fields(language = request.language.as_code()))]
    pub async fn commodity_prices(
        &self,
        request: CommodityRequest,
    ) -> Result<AssistantReply, AssistantError> {
        let started = Instant::now();
        self.metrics.inc_request();
        self.metrics.inc_intent(Intent::CommodityPrice.as_str());

        let result = match self.commodity_scope(&request.region) {
            Ok((region, state)) => {
                self.commodity_reply(region, state, request.date, request.language)
                    .await
            }
            Err(err) => Err(err),
        };
        self.finish(started, result)
    }

    #[instrument(skip(self, request), fields(language = request.language.as_code()))]
    pub async fn chat(&self, request: ChatRequest) -> Result<AssistantReply, AssistantError> {
        let started = Instant::now();
        self.metrics.inc_request();
        self.metrics.inc_intent(Intent::Chat.as_str());

        let message = normalize_text(&request.message);
        let result = if message.is_empty() {
            Err(AssistantError::InvalidInput("No message provided".to_string()))
        } else {
            self.chat_reply(&message, request.language, request.context.as_deref())
                .await
        };
        self.finish(started, result)
    }

    /// Transcribe, answer as text, then speak the answer. Synthesis failure
    /// still returns the text reply with `synthesis_degraded` set, and a
    /// missing district is answered with the spoken prompt.
    #[instrument(skip(self, request), fields(language = request.language.as_code(), audio_bytes = request.audio.len()))]
    pub async fn handle_voice(&self, request: VoiceRequest) -> Result<VoiceReply, AssistantError> {
        self.metrics.inc_voice();

        let recognized = self
            .transcribe(&request.audio, request.language)
            .await
            .inspect_err(|err| self.record_error(err))?;
        let ctx = RequestContext::new(recognized.clone(), request.language)
            .with_context(request.context);
        // A spoken question without a district gets the prompt read back.
        let reply = match self.handle_text(ctx).await {
            Ok(reply) => reply,
            Err(AssistantError::RegionRequired(topic)) => {
                self.region_prompt(topic, request.language).await
            }
            Err(err) => return Err(err),
        };

        let speech = self.synthesize_soft(&reply.text, request.language).await;
        let synthesis_degraded = speech.is_degraded();
        Ok(VoiceReply {
            recognized_text: recognized,
            reply,
            audio: speech.into_value(),
            audio_format: AUDIO_FORMAT.to_string(),
            synthesis_degraded,
        })
    }

    #[instrument(skip(self, audio), fields(audio_bytes = audio.len()))]
    pub async fn speech_to_text(
        &self,
        audio: &[u8],
        language: Language,
    ) -> Result<String, AssistantError> {
        self.metrics.inc_voice();
        self.transcribe(audio, language)
            .await
            .inspect_err(|err| self.record_error(err))
    }

    #[instrument(skip(self, text))]
    pub async fn text_to_speech(
        &self,
        text: &str,
        language: Language,
    ) -> Result<Vec<u8>, AssistantError> {
        self.metrics.inc_voice();
        let result = if text.trim().is_empty() {
            Err(AssistantError::InvalidInput("No text provided".to_string()))
        } else {
            self.collaborators
                .text_to_speech
                .synthesize(text, language)
                .await
                .map_err(|err| AssistantError::upstream("Speech synthesis", err))
        };
        result.inspect_err(|err| self.record_error(err))
    }

    /// Parent names, or the districts of one parent when `state` is given.
    pub fn regions(&self, state: Option<&str>) -> Result<RegionListing, AssistantError> {
        match state.map(str::trim).filter(|value| !value.is_empty()) {
            None => Ok(RegionListing {
                state: None,
                names: self.gazetteer.parents().to_vec(),
            }),
            Some(state) => {
                let canonical = self
                    .gazetteer
                    .canonical_parent(state)
                    .ok_or_else(|| AssistantError::RegionNotFound(state.to_string()))?;
                Ok(RegionListing {
                    state: Some(canonical.to_string()),
                    names: self
                        .gazetteer
                        .regions_in(canonical)
                        .map(|region| region.name.clone())
                        .collect(),
                })
            }
        }
    }

    async fn dispatch_text(&self, ctx: RequestContext) -> Result<AssistantReply, AssistantError> {
        let text = normalize_text(&ctx.raw_text);
        if text.is_empty() {
            return Err(AssistantError::InvalidInput("No text provided".to_string()));
        }

        let intent = classify(&text);
        self.metrics.inc_intent(intent.as_str());

        match intent {
            Intent::Weather => {
                let region = extract_region(&text, &self.gazetteer)
                    .cloned()
                    .ok_or(AssistantError::RegionRequired("weather"))?;
                self.weather_reply(region, ctx.language).await
            }
            Intent::CommodityPrice => {
                let region = extract_region(&text, &self.gazetteer)
                    .cloned()
                    .ok_or(AssistantError::RegionRequired("commodity price"))?;
                let state = region.parent.clone();
                self.commodity_reply(Some(region), state, extract_date(&text), ctx.language)
                    .await
            }
            Intent::Chat => {
                self.chat_reply(&text, ctx.language, ctx.conversation_context.as_deref())
                    .await
            }
        }
    }

    async fn weather_reply(
        &self,
        region: Region,
        language: Language,
    ) -> Result<AssistantReply, AssistantError> {
        let query = WeatherQuery {
            latitude: region.latitude,
            longitude: region.longitude,
            forecast_days: self.settings.forecast_days,
            timeout: self.settings.fetch_timeout,
        };
        let snapshot = self
            .bounded("Weather service", self.collaborators.weather.fetch_weather(&query))
            .await?;

        let text = format_weather(&snapshot, &region.name, region.parent.as_deref());
        let (text, degraded) = self.translate_out(text, language).await;
        Ok(reply(Intent::Weather, text, language, Some(region), None, degraded))
    }

    async fn commodity_reply(
        &self,
        region: Option<Region>,
        state: Option<String>,
        date: Option<NaiveDate>,
        language: Language,
    ) -> Result<AssistantReply, AssistantError> {
        let query = CommodityQuery {
            state: state.clone(),
            district: region.as_ref().map(|region| region.name.clone()),
            date,
            timeout: self.settings.fetch_timeout,
        };
        let records: Vec<CommodityRecord> = self
            .bounded(
                "Commodity price service",
                self.collaborators.commodity.fetch_commodity_prices(&query),
            )
            .await?;

        let scope = region.as_ref().map(Region::label).or(state);
        let date_label = date.map(|date| date.format("%Y-%m-%d").to_string());
        let text = format_commodity(&records, scope.as_deref(), date_label.as_deref());
        let (text, degraded) = self.translate_out(text, language).await;
        Ok(reply(
            Intent::CommodityPrice,
            text,
            language,
            region,
            Some(records),
            degraded,
        ))
    }

    async fn chat_reply(
        &self,
        message: &str,
        language: Language,
        context: Option<&str>,
    ) -> Result<AssistantReply, AssistantError> {
        let inbound = self.translation.translate_to_english(message, language).await;
        let inbound_degraded = self.note_degradation(&inbound);
        let english = inbound.into_value();

        let prompt = match context.map(str::trim).filter(|value| !value.is_empty()) {
            Some(context) => format!("{context}\n\nUser: {english}"),
            None => english,
        };
        let answer = self
            .collaborators
            .chat
            .generate_chat_reply(&prompt, &self.settings.system_prompt)
            .await
            .map_err(|err| AssistantError::upstream("Chat service", err))?;

        let (text, outbound_degraded) = self.translate_out(answer, language).await;
        Ok(reply(
            Intent::Chat,
            text,
            language,
            None,
            None,
            inbound_degraded || outbound_degraded,
        ))
    }

    async fn transcribe(&self, audio: &[u8], language: Language) -> Result<String, AssistantError> {
        if audio.is_empty() {
            return Err(AssistantError::InvalidInput("No audio provided".to_string()));
        }

        match self
            .collaborators
            .speech_to_text
            .transcribe(audio, language)
            .await
        {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) | Err(SpeechError::Unintelligible) => Err(AssistantError::Unintelligible),
            Err(SpeechError::Service(err)) => {
                Err(AssistantError::upstream("Speech recognition", err))
            }
        }
    }

    async fn synthesize_soft(&self, text: &str, language: Language) -> SoftResult<Option<Vec<u8>>> {
        match self
            .collaborators
            .text_to_speech
            .synthesize(text, language)
            .await
        {
            Ok(audio) => SoftResult::Value(Some(audio)),
            Err(err) => {
                warn!(
                    language = language.as_code(),
                    error = %format!("{err:#}"),
                    "speech synthesis failed, replying with text only"
                );
                self.metrics.inc_synthesis_degraded();
                SoftResult::fallback(None, format!("{err:#}"))
            }
        }
    }

    /// Explicit region selection: district required, state optional but must
    /// exist when given.
    fn resolve_selected(
        &self,
        selector: &RegionSelector,
        topic: &'static str,
    ) -> Result<Region, AssistantError> {
        let district = non_blank(selector.district.as_deref())
            .ok_or(AssistantError::RegionRequired(topic))?;
        let state = match non_blank(selector.state.as_deref()) {
            Some(state) => Some(
                self.gazetteer
                    .canonical_parent(state)
                    .ok_or_else(|| AssistantError::RegionNotFound(state.to_string()))?,
            ),
            None => None,
        };

        self.gazetteer
            .lookup(state, district)
            .cloned()
            .ok_or_else(|| {
                AssistantError::RegionNotFound(match state {
                    Some(state) => format!("{district}, {state}"),
                    None => district.to_string(),
                })
            })
    }

    /// Commodity filters may be a district, a bare state, or nothing (the
    /// configured default state).
    fn commodity_scope(
        &self,
        selector: &RegionSelector,
    ) -> Result<(Option<Region>, Option<String>), AssistantError> {
        if non_blank(selector.district.as_deref()).is_some() {
            let region = self.resolve_selected(selector, "commodity price")?;
            let state = region.parent.clone();
            return Ok((Some(region), state));
        }

        match non_blank(selector.state.as_deref()) {
            Some(state) => {
                let canonical = self
                    .gazetteer
                    .canonical_parent(state)
                    .ok_or_else(|| AssistantError::RegionNotFound(state.to_string()))?;
                Ok((None, Some(canonical.to_string())))
            }
            None => Ok((None, self.settings.default_commodity_state.clone())),
        }
    }

    async fn bounded<T, F>(&self, service: &'static str, fetch: F) -> Result<T, AssistantError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.settings.fetch_timeout, fetch).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(AssistantError::upstream(service, err)),
            Err(_) => Err(AssistantError::upstream(
                service,
                anyhow!("timed out after {:?}", self.settings.fetch_timeout),
            )),
        }
    }

    async fn region_prompt(&self, topic: &'static str, language: Language) -> AssistantReply {
        let intent = match topic {
            "weather" => Intent::Weather,
            _ => Intent::CommodityPrice,
        };
        let prompt = AssistantError::RegionRequired(topic).to_string();
        let (text, degraded) = self.translate_out(prompt, language).await;
        reply(intent, text, language, None, None, degraded)
    }

    async fn translate_out(&self, text: String, language: Language) -> (String, bool) {
        let translated = self.translation.translate(&text, language).await;
        let degraded = self.note_degradation(&translated);
        (translated.into_value(), degraded)
    }

    fn note_degradation(&self, result: &SoftResult<String>) -> bool {
        if result.is_degraded() {
            self.metrics.inc_translation_degraded();
        }
        result.is_degraded()
    }

    fn finish(
        &self,
        started: Instant,
        result: Result<AssistantReply, AssistantError>,
    ) -> Result<AssistantReply, AssistantError> {
        self.metrics.observe_latency(started.elapsed());
        match &result {
            Ok(reply) => info!(
                request_id = %reply.request_id,
                intent = reply.intent.as_str(),
                region = reply.region.as_ref().map(Region::label).unwrap_or_default(),
                translation_degraded = reply.translation_degraded,
                "request handled"
            ),
            Err(err) => self.record_error(err),
        }
        result
    }

    fn record_error(&self, err: &AssistantError) {
        match err.kind() {
            ErrorKind::User => {
                self.metrics.record_outcome(Outcome::UserError);
                info!(code = err.code(), "request rejected");
            }
            ErrorKind::Upstream => {
                self.metrics.record_outcome(Outcome::UpstreamFailure);
                let cause = std::error::Error::source(err)
                    .map(|source| format!("{source:#}"))
                    .unwrap_or_default();
                warn!(code = err.code(), error = %err, cause = %cause, "upstream failure");
            }
        }
    }
}

fn reply(
    intent: Intent,
    text: String,
    language: Language,
    region: Option<Region>,
    records: Option<Vec<CommodityRecord>>,
    translation_degraded: bool,
) -> AssistantReply {
    AssistantReply {
        request_id: Uuid::new_v4().to_string(),
        intent,
        text,
        language,
        region,
        records,
        translation_degraded,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
