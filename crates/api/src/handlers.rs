use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDate;
use mausam_agents::{RegionListing, VoiceRequest, AUDIO_FORMAT};
use mausam_core::{
    AssistantReply, ChatRequest, CommodityRecord, CommodityRequest, Language, Region,
    RegionSelector, RequestContext, WeatherRequest,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::{ApiState, HealthResponse};

#[derive(Debug, Deserialize)]
pub(crate) struct RegionsQuery {
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WeatherBody {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommodityBody {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProcessTextBody {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AudioBody {
    #[serde(default)]
    audio: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpeakBody {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReplyBody {
    request_id: String,
    response: String,
    intent: &'static str,
    language: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<Vec<CommodityRecord>>,
    translation_degraded: bool,
}

impl From<AssistantReply> for ReplyBody {
    fn from(reply: AssistantReply) -> Self {
        Self {
            request_id: reply.request_id,
            response: reply.text,
            intent: reply.intent.as_str(),
            language: reply.language.as_code(),
            region: reply.region,
            records: reply.records,
            translation_degraded: reply.translation_degraded,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TranscriptBody {
    text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpeechBody {
    audio: String,
    format: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct VoiceBody {
    request_id: String,
    recognized_text: String,
    response_text: String,
    intent: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<String>,
    format: String,
    translation_degraded: bool,
    synthesis_degraded: bool,
}

pub(crate) async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        gazetteer: state.assistant.gazetteer().profile().to_string(),
        languages: Language::ALL.iter().map(|lang| lang.as_code()).collect(),
        metrics: state.metrics.snapshot(),
        capabilities: state.capabilities,
    };
    (StatusCode::OK, Json(payload))
}

pub(crate) async fn regions(
    State(state): State<ApiState>,
    Query(query): Query<RegionsQuery>,
) -> ApiResult<Json<RegionListing>> {
    Ok(Json(state.assistant.regions(query.state.as_deref())?))
}

pub(crate) async fn weather(
    State(state): State<ApiState>,
    Json(body): Json<WeatherBody>,
) -> ApiResult<Json<ReplyBody>> {
    let request = WeatherRequest {
        region: RegionSelector {
            state: body.state,
            district: body.district,
        },
        language: language(body.language.as_deref())?,
    };
    let reply = state.assistant.weather(request).await?;
    Ok(Json(reply.into()))
}

pub(crate) async fn commodity_prices(
    State(state): State<ApiState>,
    Json(body): Json<CommodityBody>,
) -> ApiResult<Json<ReplyBody>> {
    let request = CommodityRequest {
        region: RegionSelector {
            state: body.state,
            district: body.district,
        },
        date: arrival_date(body.date.as_deref()),
        language: language(body.language.as_deref())?,
    };
    let reply = state.assistant.commodity_prices(request).await?;
    Ok(Json(reply.into()))
}

pub(crate) async fn chat(
    State(state): State<ApiState>,
    Json(body): Json<ChatBody>,
) -> ApiResult<Json<ReplyBody>> {
    let request = ChatRequest {
        message: body.message,
        language: language(body.language.as_deref())?,
        context: body.context,
    };
    let reply = state.assistant.chat(request).await?;
    Ok(Json(reply.into()))
}

pub(crate) async fn process_text(
    State(state): State<ApiState>,
    Json(body): Json<ProcessTextBody>,
) -> ApiResult<Json<ReplyBody>> {
    let ctx = RequestContext::new(body.text, language(body.language.as_deref())?)
        .with_context(body.context);
    let reply = state.assistant.handle_text(ctx).await?;
    Ok(Json(reply.into()))
}

pub(crate) async fn speech_to_text(
    State(state): State<ApiState>,
    Json(body): Json<AudioBody>,
) -> ApiResult<Json<TranscriptBody>> {
    let language = language(body.language.as_deref())?;
    let audio = decode_audio(&body.audio)?;
    let text = state.assistant.speech_to_text(&audio, language).await?;
    Ok(Json(TranscriptBody { text }))
}

pub(crate) async fn text_to_speech(
    State(state): State<ApiState>,
    Json(body): Json<SpeakBody>,
) -> ApiResult<Json<SpeechBody>> {
    let language = language(body.language.as_deref())?;
    let audio = state.assistant.text_to_speech(&body.text, language).await?;
    Ok(Json(SpeechBody {
        audio: STANDARD.encode(audio),
        format: AUDIO_FORMAT,
    }))
}

pub(crate) async fn voice(
    State(state): State<ApiState>,
    Json(body): Json<AudioBody>,
) -> ApiResult<Json<VoiceBody>> {
    let request = VoiceRequest {
        language: language(body.language.as_deref())?,
        audio: decode_audio(&body.audio)?,
        context: body.context,
    };
    let voice = state.assistant.handle_voice(request).await?;

    Ok(Json(VoiceBody {
        request_id: voice.reply.request_id,
        recognized_text: voice.recognized_text,
        response_text: voice.reply.text,
        intent: voice.reply.intent.as_str(),
        audio: voice.audio.map(|bytes| STANDARD.encode(bytes)),
        format: voice.audio_format,
        translation_degraded: voice.reply.translation_degraded,
        synthesis_degraded: voice.synthesis_degraded,
    }))
}

fn language(code: Option<&str>) -> ApiResult<Language> {
    Ok(Language::from_optional_str(code)?)
}

fn decode_audio(encoded: &str) -> ApiResult<Vec<u8>> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(ApiError::BadRequest("No audio provided".to_string()));
    }
    STANDARD
        .decode(encoded)
        .map_err(|_| ApiError::BadRequest("audio must be base64 encoded".to_string()))
}

/// Unparseable dates are dropped rather than rejected; the lookup then runs
/// without a date filter.
fn arrival_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(date = raw, error = %err, "ignoring unparseable commodity date");
            None
        }
    }
}
