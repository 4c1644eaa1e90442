use std::time::Duration;

use mausam_providers::{env_parse, env_string};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful weather and farm-market assistant for India. \
Answer questions about weather, climate, crops and mandi prices in a friendly, concise way. \
For live conditions or prices, remind users they can ask for a district's weather or commodity prices directly.";

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// Upper bound for a weather or commodity fetch. Elapsing counts as an
    /// upstream failure.
    pub fetch_timeout: Duration,
    pub forecast_days: u8,
    /// State filter for commodity lookups that name no region.
    pub default_commodity_state: Option<String>,
    pub system_prompt: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            forecast_days: 16,
            default_commodity_state: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl AssistantSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fetch_timeout: Duration::from_secs(env_parse(
                "MAUSAM_FETCH_TIMEOUT_SECONDS",
                defaults.fetch_timeout.as_secs(),
            )),
            forecast_days: env_parse("MAUSAM_FORECAST_DAYS", defaults.forecast_days).clamp(1, 16),
            default_commodity_state: env_string("MAUSAM_COMMODITY_STATE"),
            system_prompt: env_string("MAUSAM_SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
        }
    }
}
