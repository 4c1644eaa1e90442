use chrono::{NaiveDate, NaiveDateTime};

use crate::models::WeatherSnapshot;

pub const HEAT_WARNING: &str = "Very hot! Stay hydrated and avoid sun exposure";
pub const HOT_NOTE: &str = "Hot weather - wear light clothing";
pub const COLD_NOTE: &str = "Cool weather - carry a jacket";
pub const RAIN_WARNING: &str = "Rain expected - carry an umbrella";

const HEAT_THRESHOLD: f64 = 35.0;
const HOT_THRESHOLD: f64 = 30.0;
const COLD_THRESHOLD: f64 = 15.0;
const RAIN_PROBABILITY_THRESHOLD: f64 = 60.0;
const RAIN_LOOKAHEAD_DAYS: usize = 3;
const HOURLY_WINDOW: usize = 24;
const HOURLY_STRIDE: usize = 6;
const NOT_AVAILABLE: &str = "N/A";

/// WMO weather interpretation codes as used by Open-Meteo.
pub fn describe_weather_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Foggy",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

/// Renders a forecast document as plain text. Missing values print as "N/A".
pub fn format_weather(
    snapshot: &WeatherSnapshot,
    region_name: &str,
    parent_name: Option<&str>,
) -> String {
    let current = &snapshot.current;
    let mut out = String::new();

    match parent_name {
        Some(parent) => out.push_str(&format!("Current weather in {region_name}, {parent}:\n")),
        None => out.push_str(&format!("Current weather in {region_name}:\n")),
    }
    out.push_str(&format!(
        "Temperature: {}°C\n",
        number(current.temperature_2m)
    ));
    out.push_str(&format!(
        "Feels like: {}°C\n",
        number(current.apparent_temperature)
    ));
    out.push_str(&format!("Condition: {}\n", condition(current.weather_code)));
    out.push_str(&format!(
        "Humidity: {}%\n",
        number(current.relative_humidity_2m)
    ));
    out.push_str(&format!(
        "Precipitation: {} mm\n",
        number(current.precipitation)
    ));
    out.push_str(&format!(
        "Wind speed: {} km/h\n",
        number(current.wind_speed_10m)
    ));

    push_today(&mut out, snapshot);
    push_hourly(&mut out, snapshot);
    push_daily(&mut out, snapshot);
    push_tips(&mut out, snapshot);

    out
}

fn push_today(out: &mut String, snapshot: &WeatherSnapshot) {
    let daily = &snapshot.daily;
    if daily.temperature_2m_max.is_empty() || daily.temperature_2m_min.is_empty() {
        return;
    }

    out.push_str(&format!(
        "\nToday's range: {}°C - {}°C\n",
        number(series_at(&daily.temperature_2m_min, 0)),
        number(series_at(&daily.temperature_2m_max, 0)),
    ));

    if !daily.sunrise.is_empty() && !daily.sunset.is_empty() {
        out.push_str(&format!(
            "Sunrise: {} | Sunset: {}\n",
            clock(daily.sunrise[0].as_deref(), "%I:%M %p"),
            clock(daily.sunset[0].as_deref(), "%I:%M %p"),
        ));
    }
}

fn push_hourly(out: &mut String, snapshot: &WeatherSnapshot) {
    let hourly = &snapshot.hourly;
    if hourly.time.is_empty() {
        return;
    }

    out.push_str("\nNext 24 hours:\n");
    let window = hourly.time.len().min(HOURLY_WINDOW);
    for idx in (0..window).step_by(HOURLY_STRIDE) {
        out.push_str(&format!(
            "{}: {}°C, {}% rain chance\n",
            clock(Some(hourly.time[idx].as_str()), "%I %p"),
            number(series_at(&hourly.temperature_2m, idx)),
            number(series_at(&hourly.precipitation_probability, idx)),
        ));
    }
}

fn push_daily(out: &mut String, snapshot: &WeatherSnapshot) {
    let daily = &snapshot.daily;
    if daily.time.len() < 2 {
        return;
    }

    out.push_str(&format!("\n{}-day forecast:\n", daily.time.len() - 1));
    for (idx, day) in daily.time.iter().enumerate().skip(1) {
        let label = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map(|date| date.format("%a, %b %d").to_string())
            .unwrap_or_else(|_| day.clone());
        let code = daily.weather_code.get(idx).copied().flatten();

        out.push_str(&format!("{label}: {}\n", condition(code)));
        out.push_str(&format!(
            "   {}°C - {}°C",
            number(series_at(&daily.temperature_2m_min, idx)),
            number(series_at(&daily.temperature_2m_max, idx)),
        ));
        if let Some(rain) = series_at(&daily.precipitation_sum, idx).filter(|rain| *rain > 0.0) {
            out.push_str(&format!(
                " | {rain:.1}mm ({}% chance)",
                number(series_at(&daily.precipitation_probability_max, idx))
            ));
        }
        out.push('\n');
    }
}

fn push_tips(out: &mut String, snapshot: &WeatherSnapshot) {
    out.push_str("\nTips:\n");
    for tip in advisory_tips(snapshot) {
        out.push_str(&format!("- {tip}\n"));
    }
}

/// Advisory lines for the current conditions, in display order.
pub fn advisory_tips(snapshot: &WeatherSnapshot) -> Vec<&'static str> {
    let mut tips = Vec::new();

    if let Some(temp) = snapshot.current.temperature_2m {
        if temp > HEAT_THRESHOLD {
            tips.push(HEAT_WARNING);
        } else if temp >= HOT_THRESHOLD {
            tips.push(HOT_NOTE);
        } else if temp < COLD_THRESHOLD {
            tips.push(COLD_NOTE);
        }
    }

    let raining_now = snapshot
        .current
        .precipitation
        .map(|value| value > 0.0)
        .unwrap_or(false);
    let rain_soon = snapshot
        .daily
        .precipitation_probability_max
        .iter()
        .take(RAIN_LOOKAHEAD_DAYS)
        .flatten()
        .any(|probability| *probability > RAIN_PROBABILITY_THRESHOLD);
    if raining_now || rain_soon {
        tips.push(RAIN_WARNING);
    }

    tips
}

fn series_at(series: &[Option<f64>], idx: usize) -> Option<f64> {
    series.get(idx).copied().flatten()
}

fn number(value: Option<f64>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn condition(code: Option<u16>) -> &'static str {
    code.map(describe_weather_code).unwrap_or(NOT_AVAILABLE)
}

fn clock(raw: Option<&str>, pattern: &str) -> String {
    let Some(raw) = raw else {
        return NOT_AVAILABLE.to_string();
    };
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map(|time| time.format(pattern).to_string())
        .unwrap_or_else(|_| raw.to_string())
}
