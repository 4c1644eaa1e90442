mod error;
mod handlers;
mod rate_limit;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mausam_agents::{Capabilities, WeatherAssistant};
use mausam_observability::{AppMetrics, MetricsSnapshot};
use mausam_providers::env_parse;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{ApiError, ApiResult};
pub use rate_limit::IpRateLimiter;

/// Voice payloads carry base64 audio, so the limit is well above text needs.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;
const DEFAULT_RATE_LIMIT_MAX: usize = 60;

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<WeatherAssistant>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: IpRateLimiter,
    pub allowed_origins: Arc<Vec<String>>,
    pub capabilities: Capabilities,
    /// Key clients on `x-forwarded-for` instead of the peer address.
    pub trust_proxy: bool,
}

impl ApiState {
    pub fn new(assistant: WeatherAssistant) -> Self {
        Self {
            metrics: assistant.metrics().clone(),
            assistant: Arc::new(assistant),
            limiter: IpRateLimiter::new(
                Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
                DEFAULT_RATE_LIMIT_MAX,
            ),
            allowed_origins: Arc::new(default_origins()),
            capabilities: Capabilities::default(),
            trust_proxy: false,
        }
    }

    pub fn with_limiter(mut self, limiter: IpRateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = Arc::new(origins);
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_trusted_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    gazetteer: String,
    languages: Vec<&'static str>,
    metrics: MetricsSnapshot,
    capabilities: Capabilities,
}

/// Router wired to the production collaborators, configured from the
/// environment.
pub async fn build_app() -> Result<Router> {
    let (assistant, capabilities) = WeatherAssistant::from_env(AppMetrics::shared())?;

    let limiter = IpRateLimiter::new(
        Duration::from_secs(env_parse(
            "MAUSAM_RATE_LIMIT_WINDOW_SECONDS",
            DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
        )),
        env_parse("MAUSAM_RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX),
    );
    let allowed_origins = parse_allowed_origins();
    let trust_proxy = env_parse("MAUSAM_TRUST_PROXY", false);
    info!(
        origins = allowed_origins.len(),
        trust_proxy,
        commodity_prices = capabilities.commodity_prices,
        chat = capabilities.chat,
        speech_to_text = capabilities.speech_to_text,
        "api state ready"
    );

    let state = ApiState::new(assistant)
        .with_limiter(limiter)
        .with_allowed_origins(allowed_origins)
        .with_capabilities(capabilities)
        .with_trusted_proxy(trust_proxy);
    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/regions", get(handlers::regions))
        .route("/v1/weather", post(handlers::weather))
        .route("/v1/commodity-prices", post(handlers::commodity_prices))
        .route("/v1/chat", post(handlers::chat))
        .route("/v1/process-text", post(handlers::process_text))
        .route("/v1/speech-to-text", post(handlers::speech_to_text))
        .route("/v1/text-to-speech", post(handlers::text_to_speech))
        .route("/v1/voice", post(handlers::voice))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

fn default_origins() -> Vec<String> {
    [
        "http://localhost:5500",
        "http://127.0.0.1:5500",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:8501",
    ]
    .iter()
    .map(|value| value.to_string())
    .collect()
}

fn parse_allowed_origins() -> Vec<String> {
    env::var("MAUSAM_ALLOWED_ORIGINS")
        .ok()
        .map(|value| {
            value
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty())
        .unwrap_or_else(default_origins)
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5500")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let ip = request_ip(&request, state.trust_proxy);
    if !state.limiter.allow(&ip) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this IP"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

/// Client key for rate limiting. The forwarded header is only honoured behind
/// a trusted proxy; otherwise the peer address from `ConnectInfo` is used.
fn request_ip(request: &Request<Body>, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| request.headers().get("x-forwarded-for"))
        .flatten()
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_peer(peer: &str, forwarded: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn peer_address_keys_clients_by_default() {
        let request = from_peer("198.51.100.7:52114", Some("203.0.113.9"));
        assert_eq!(request_ip(&request, false), "198.51.100.7");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(request_ip(&request, false), "unknown");
    }

    #[test]
    fn trusted_proxy_uses_first_forwarded_hop() {
        let request = from_peer("10.0.0.1:443", Some("203.0.113.9, 10.0.0.1"));
        assert_eq!(request_ip(&request, true), "203.0.113.9");

        let request = from_peer("10.0.0.1:443", None);
        assert_eq!(request_ip(&request, true), "10.0.0.1");
    }

    #[test]
    fn default_origins_are_trimmed_urls() {
        let origins = default_origins();
        assert!(origins.iter().all(|origin| !origin.ends_with('/')));
        assert!(origins.contains(&"http://localhost:8501".to_string()));
    }
}
