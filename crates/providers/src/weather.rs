use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use mausam_core::WeatherSnapshot;
use reqwest::Client;
use tracing::debug;

use crate::config::env_string;
use crate::{WeatherProvider, WeatherQuery};

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,wind_speed_10m,wind_direction_10m";
const HOURLY_FIELDS: &str =
    "temperature_2m,precipitation_probability,precipitation,weather_code,wind_speed_10m";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,apparent_temperature_max,apparent_temperature_min,sunrise,sunset,precipitation_sum,precipitation_probability_max,wind_speed_10m_max";
const TIMEZONE: &str = "Asia/Kolkata";

/// Open-Meteo forecast API. No key required.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .build()
            .context("failed to build weather HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(
            env_string("MAUSAM_WEATHER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )
    }
}

fn forecast_params(query: &WeatherQuery) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", query.latitude.to_string()),
        ("longitude", query.longitude.to_string()),
        ("current", CURRENT_FIELDS.to_string()),
        ("hourly", HOURLY_FIELDS.to_string()),
        ("daily", DAILY_FIELDS.to_string()),
        ("timezone", TIMEZONE.to_string()),
        ("forecast_days", query.forecast_days.clamp(1, 16).to_string()),
    ]
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<WeatherSnapshot> {
        debug!(
            latitude = query.latitude,
            longitude = query.longitude,
            forecast_days = query.forecast_days,
            "fetching forecast"
        );

        let response = self
            .http
            .get(format!("{}/v1/forecast", self.base_url))
            .query(&forecast_params(query))
            .timeout(query.timeout)
            .send()
            .await
            .context("weather request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("weather service returned {}: {}", status.as_u16(), body);
        }

        response
            .json::<WeatherSnapshot>()
            .await
            .context("weather response parse failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_india_timezone_and_clamps_horizon() {
        let params = forecast_params(&WeatherQuery {
            latitude: 23.0225,
            longitude: 72.5714,
            forecast_days: 30,
            timeout: Duration::from_secs(10),
        });

        let lookup = |key: &str| {
            params
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
        };
        assert_eq!(lookup("timezone").as_deref(), Some("Asia/Kolkata"));
        assert_eq!(lookup("forecast_days").as_deref(), Some("16"));
        assert_eq!(lookup("latitude").as_deref(), Some("23.0225"));
        assert!(lookup("daily").unwrap_or_default().contains("sunrise"));
    }
}
