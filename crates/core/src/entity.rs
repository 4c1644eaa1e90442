use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::gazetteer::Gazetteer;
use crate::models::Region;

static ISO_DATE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").ok());

/// First gazetteer region whose name occurs anywhere in `text`.
///
/// Plain case-insensitive substring test in gazetteer order: no word
/// boundaries and no longest-match preference, so "Mon" matches "month".
pub fn extract_region<'a>(text: &str, gazetteer: &'a Gazetteer) -> Option<&'a Region> {
    let lower = text.to_lowercase();
    gazetteer
        .search_names()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, region)| region)
}

/// First `YYYY-MM-DD` token that is a real calendar date.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    let pattern = ISO_DATE.as_ref()?;
    pattern.captures_iter(text).find_map(|caps| {
        let year = caps.get(1)?.as_str().parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        let day = caps.get(3)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}
