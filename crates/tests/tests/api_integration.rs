use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mausam_agents::testing::{
    sample_records, snapshot_with_temperature, FakeCommodity, FakeSpeech, FakeTranslator,
    FakeTts, FakeWeather, Fakes, SpeechOutcome, FAKE_AUDIO,
};
use mausam_api::{build_router, ApiState, IpRateLimiter};
use mausam_core::GazetteerProfile;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(fakes: &Fakes, profile: GazetteerProfile) -> Router {
    let assistant = fakes.assistant(profile).expect("assistant should build");
    build_router(ApiState::new(assistant))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_metrics_and_profile() {
    let app = app_with(&Fakes::default(), GazetteerProfile::Gujarat);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let parsed = read_json(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["gazetteer"], "gujarat");
    assert!(parsed["metrics"]["requests_total"].is_u64());
    assert_eq!(parsed["languages"].as_array().map(Vec::len), Some(9));
}

#[tokio::test]
async fn weather_endpoint_formats_forecast() {
    let fakes = Fakes {
        weather: Arc::new(FakeWeather::returning(snapshot_with_temperature(38.0))),
        ..Fakes::default()
    };
    let app = app_with(&fakes, GazetteerProfile::India);

    let response = app
        .oneshot(post_json(
            "/v1/weather",
            json!({ "state": "Gujarat", "district": "Ahmedabad" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["intent"], "weather");
    assert_eq!(parsed["region"]["name"], "Ahmedabad");
    let text = parsed["response"].as_str().unwrap();
    assert!(text.contains("Condition: Clear sky"));
    assert!(text.contains("Very hot! Stay hydrated and avoid sun exposure"));
}

#[tokio::test]
async fn weather_without_district_is_bad_request() {
    let app = app_with(&Fakes::default(), GazetteerProfile::India);

    let response = app
        .oneshot(post_json("/v1/weather", json!({ "state": "Gujarat" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "region_required");
}

#[tokio::test]
async fn unknown_district_is_not_found() {
    let app = app_with(&Fakes::default(), GazetteerProfile::India);

    let response = app
        .oneshot(post_json(
            "/v1/weather",
            json!({ "state": "Kerala", "district": "Springfield" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unsupported_language_is_bad_request() {
    let app = app_with(&Fakes::default(), GazetteerProfile::India);

    let response = app
        .oneshot(post_json(
            "/v1/process-text",
            json!({ "text": "weather in Surat", "language": "fr" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "unsupported_language");
}

#[tokio::test]
async fn slow_upstream_maps_to_bad_gateway() {
    let fakes = Fakes {
        weather: Arc::new(FakeWeather::slow(
            snapshot_with_temperature(30.0),
            Duration::from_secs(2),
        )),
        ..Fakes::default()
    };
    let app = app_with(&fakes, GazetteerProfile::Gujarat);

    let response = app
        .oneshot(post_json("/v1/process-text", json!({ "text": "weather in Surat" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "upstream_unavailable");
    assert_eq!(
        parsed["message"],
        "Weather service is temporarily unavailable. Please try again."
    );
}

#[tokio::test]
async fn process_text_routes_commodity_questions() {
    let fakes = Fakes {
        commodity: Arc::new(FakeCommodity::returning(sample_records(2))),
        ..Fakes::default()
    };
    let app = app_with(&fakes, GazetteerProfile::Gujarat);

    let response = app
        .oneshot(post_json(
            "/v1/process-text",
            json!({ "text": "cotton price in Rajkot on 2024-03-15" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["intent"], "commodity_price");
    assert_eq!(parsed["records"].as_array().map(Vec::len), Some(2));
    assert_eq!(parsed["records"][0]["Commodity"], "Onion");
    assert!(parsed["response"]
        .as_str()
        .unwrap()
        .starts_with("Commodity prices in Rajkot, Gujarat for 2024-03-15:"));
}

#[tokio::test]
async fn commodity_endpoint_ignores_bad_date() {
    let fakes = Fakes::default();
    let app = app_with(&fakes, GazetteerProfile::Gujarat);

    let response = app
        .oneshot(post_json(
            "/v1/commodity-prices",
            json!({ "district": "Rajkot", "date": "15-03-2024" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let query = fakes.commodity.last_query().unwrap();
    assert!(query.date.is_none());
    assert_eq!(query.district.as_deref(), Some("Rajkot"));
}

#[tokio::test]
async fn commodity_outage_maps_to_bad_gateway() {
    let fakes = Fakes {
        commodity: Arc::new(FakeCommodity::failing()),
        ..Fakes::default()
    };
    let app = app_with(&fakes, GazetteerProfile::Gujarat);

    let response = app
        .oneshot(post_json(
            "/v1/commodity-prices",
            json!({ "district": "Rajkot" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "upstream_unavailable");
    assert_eq!(
        parsed["message"],
        "Commodity price service is temporarily unavailable. Please try again."
    );
}

#[tokio::test]
async fn chat_translates_reply_and_flags_degradation() {
    let translated = Fakes::default();
    let app = app_with(&translated, GazetteerProfile::India);
    let response = app
        .oneshot(post_json(
            "/v1/chat",
            json!({ "message": "kab barish hogi?", "language": "hi" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert!(parsed["response"].as_str().unwrap().starts_with("[hi] "));
    assert_eq!(parsed["translation_degraded"], false);

    let broken = Fakes {
        translator: Arc::new(FakeTranslator::failing()),
        ..Fakes::default()
    };
    let app = app_with(&broken, GazetteerProfile::India);
    let response = app
        .oneshot(post_json(
            "/v1/chat",
            json!({ "message": "kab barish hogi?", "language": "hi" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["response"], "Monsoon reaches Kerala in early June.");
    assert_eq!(parsed["translation_degraded"], true);
}

#[tokio::test]
async fn voice_returns_transcript_reply_and_audio() {
    let app = app_with(&Fakes::default(), GazetteerProfile::Gujarat);

    let response = app
        .oneshot(post_json(
            "/v1/voice",
            json!({ "audio": STANDARD.encode(b"RIFF....WAVE"), "language": "en" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["recognized_text"], "weather in Surat");
    assert!(parsed["response_text"]
        .as_str()
        .unwrap()
        .starts_with("Current weather in Surat, Gujarat:"));
    assert_eq!(parsed["format"], "mp3");
    assert_eq!(
        STANDARD.decode(parsed["audio"].as_str().unwrap()).unwrap(),
        FAKE_AUDIO
    );
}

#[tokio::test]
async fn voice_survives_synthesis_failure() {
    let fakes = Fakes {
        tts: Arc::new(FakeTts::failing()),
        ..Fakes::default()
    };
    let app = app_with(&fakes, GazetteerProfile::Gujarat);

    let response = app
        .oneshot(post_json(
            "/v1/voice",
            json!({ "audio": STANDARD.encode(b"RIFF") }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert!(parsed.get("audio").is_none());
    assert_eq!(parsed["synthesis_degraded"], true);
    assert!(parsed["response_text"].as_str().unwrap().contains("Surat"));
}

#[tokio::test]
async fn unintelligible_audio_is_bad_request() {
    let fakes = Fakes {
        speech: Arc::new(FakeSpeech::new(SpeechOutcome::Unintelligible)),
        ..Fakes::default()
    };
    let app = app_with(&fakes, GazetteerProfile::Gujarat);

    let response = app
        .oneshot(post_json(
            "/v1/speech-to-text",
            json!({ "audio": STANDARD.encode(b"static") }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "unintelligible_audio");
    assert_eq!(parsed["message"], "Could not understand audio");
}

#[tokio::test]
async fn text_to_speech_returns_base64_mp3() {
    let fakes = Fakes::default();
    let app = app_with(&fakes, GazetteerProfile::Gujarat);

    let response = app
        .oneshot(post_json(
            "/v1/text-to-speech",
            json!({ "text": "Aaj mausam saaf hai", "language": "hi" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["format"], "mp3");
    assert_eq!(
        STANDARD.decode(parsed["audio"].as_str().unwrap()).unwrap(),
        FAKE_AUDIO
    );
    assert_eq!(fakes.tts.requests.lock()[0].0, "Aaj mausam saaf hai");
}

#[tokio::test]
async fn regions_lists_districts() {
    let app = app_with(&Fakes::default(), GazetteerProfile::India);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/regions?state=gujarat")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["state"], "Gujarat");
    assert!(parsed["names"]
        .as_array()
        .unwrap()
        .iter()
        .any(|name| name == "Surat"));
}

fn from_peer(uri: &str, peer: &str, forwarded: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    if let Some(forwarded) = forwarded {
        builder = builder.header("x-forwarded-for", forwarded);
    }
    builder.body(Body::empty()).unwrap()
}

fn limited_app(trust_proxy: bool) -> Router {
    let assistant = Fakes::default()
        .assistant(GazetteerProfile::Gujarat)
        .unwrap();
    build_router(
        ApiState::new(assistant)
            .with_limiter(IpRateLimiter::new(Duration::from_secs(60), 1))
            .with_trusted_proxy(trust_proxy),
    )
}

#[tokio::test]
async fn rate_limit_applies_per_peer_address() {
    let app = limited_app(false);

    let first = app
        .clone()
        .oneshot(from_peer("/v1/regions", "198.51.100.7:40000", None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let other_client = app
        .clone()
        .oneshot(from_peer("/v1/regions", "198.51.100.8:40000", None))
        .await
        .unwrap();
    assert_eq!(other_client.status(), StatusCode::OK);

    let repeat = app
        .clone()
        .oneshot(from_peer("/v1/regions", "198.51.100.7:40001", None))
        .await
        .unwrap();
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);

    let spoofed = app
        .clone()
        .oneshot(from_peer(
            "/v1/regions",
            "198.51.100.7:40002",
            Some("1.2.3.4"),
        ))
        .await
        .unwrap();
    assert_eq!(spoofed.status(), StatusCode::TOO_MANY_REQUESTS);

    let health = app
        .oneshot(from_peer("/health", "198.51.100.7:40003", None))
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn trusted_proxy_limits_forwarded_clients() {
    let app = limited_app(true);
    let proxy = "10.0.0.1:8443";

    let first = app
        .clone()
        .oneshot(from_peer("/v1/regions", proxy, Some("203.0.113.9")))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let other_client = app
        .clone()
        .oneshot(from_peer("/v1/regions", proxy, Some("203.0.113.10")))
        .await
        .unwrap();
    assert_eq!(other_client.status(), StatusCode::OK);

    let repeat = app
        .oneshot(from_peer("/v1/regions", proxy, Some("203.0.113.9, 10.0.0.1")))
        .await
        .unwrap();
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
}
