use crate::models::Intent;

/// Ordered classification rules. The first rule with a matching keyword wins.
///
/// Weather is checked before commodity prices: "market" belongs to the
/// commodity vocabulary, so a phrase such as "market weather today" must
/// resolve to `Intent::Weather`.
pub const INTENT_RULES: &[(&[&str], Intent)] = &[
    (
        &["weather", "temperature", "rain", "forecast", "climate"],
        Intent::Weather,
    ),
    (
        &["price", "commodity", "market", "cost", "rate"],
        Intent::CommodityPrice,
    ),
];

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Keyword classifier. Never fails; anything unmatched is `Intent::Chat`.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();

    INTENT_RULES
        .iter()
        .find(|(keywords, _)| contains_any(&lower, keywords))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::Chat)
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
