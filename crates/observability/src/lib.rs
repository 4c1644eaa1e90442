use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// In-process counters surfaced on `/health`. Every update is mirrored to the
/// `metrics` facade so an installed exporter sees the same numbers.
#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    weather_total: AtomicU64,
    commodity_total: AtomicU64,
    chat_total: AtomicU64,
    voice_total: AtomicU64,
    translation_degraded_total: AtomicU64,
    synthesis_degraded_total: AtomicU64,
    user_errors_total: AtomicU64,
    upstream_failures_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub weather_total: u64,
    pub commodity_total: u64,
    pub chat_total: u64,
    pub voice_total: u64,
    pub translation_degraded_total: u64,
    pub synthesis_degraded_total: u64,
    pub user_errors_total: u64,
    pub upstream_failures_total: u64,
    pub avg_latency_millis: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    UserError,
    UpstreamFailure,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        counter!("mausam_requests_total").increment(1);
    }

    /// Counts a dispatched request by intent label: `weather`,
    /// `commodity_price` or `chat`.
    pub fn inc_intent(&self, intent: &'static str) {
        let slot = match intent {
            "weather" => &self.weather_total,
            "commodity_price" => &self.commodity_total,
            _ => &self.chat_total,
        };
        slot.fetch_add(1, Ordering::Relaxed);
        counter!("mausam_intent_total", "intent" => intent).increment(1);
    }

    pub fn inc_voice(&self) {
        self.voice_total.fetch_add(1, Ordering::Relaxed);
        counter!("mausam_voice_total").increment(1);
    }

    pub fn inc_translation_degraded(&self) {
        self.translation_degraded_total
            .fetch_add(1, Ordering::Relaxed);
        counter!("mausam_translation_degraded_total").increment(1);
    }

    pub fn inc_synthesis_degraded(&self) {
        self.synthesis_degraded_total.fetch_add(1, Ordering::Relaxed);
        counter!("mausam_synthesis_degraded_total").increment(1);
    }

    pub fn record_outcome(&self, outcome: Outcome) {
        match outcome {
            Outcome::UserError => {
                self.user_errors_total.fetch_add(1, Ordering::Relaxed);
                counter!("mausam_user_errors_total").increment(1);
            }
            Outcome::UpstreamFailure => {
                self.upstream_failures_total.fetch_add(1, Ordering::Relaxed);
                counter!("mausam_upstream_failures_total").increment(1);
            }
        }
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        histogram!("mausam_request_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            weather_total: self.weather_total.load(Ordering::Relaxed),
            commodity_total: self.commodity_total.load(Ordering::Relaxed),
            chat_total: self.chat_total.load(Ordering::Relaxed),
            voice_total: self.voice_total.load(Ordering::Relaxed),
            translation_degraded_total: self.translation_degraded_total.load(Ordering::Relaxed),
            synthesis_degraded_total: self.synthesis_degraded_total.load(Ordering::Relaxed),
            user_errors_total: self.user_errors_total.load(Ordering::Relaxed),
            upstream_failures_total: self.upstream_failures_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,mausam_api=info,mausam_agents=info,mausam_translate=info,mausam_providers=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_tracks_counters() {
        let metrics = AppMetrics::default();
        metrics.inc_request();
        metrics.inc_request();
        metrics.inc_intent("weather");
        metrics.inc_intent("chat");
        metrics.inc_translation_degraded();
        metrics.record_outcome(Outcome::UpstreamFailure);
        metrics.observe_latency(Duration::from_millis(30));
        metrics.observe_latency(Duration::from_millis(10));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.weather_total, 1);
        assert_eq!(snapshot.chat_total, 1);
        assert_eq!(snapshot.commodity_total, 0);
        assert_eq!(snapshot.translation_degraded_total, 1);
        assert_eq!(snapshot.upstream_failures_total, 1);
        assert_eq!(snapshot.avg_latency_millis, 20.0);
    }

    #[test]
    fn empty_snapshot_has_zero_latency() {
        assert_eq!(AppMetrics::default().snapshot().avg_latency_millis, 0.0);
    }
}
