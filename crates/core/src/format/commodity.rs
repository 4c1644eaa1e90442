use crate::models::CommodityRecord;

pub const NO_COMMODITY_DATA: &str = "No commodity price data found for the selected criteria.";

const MAX_LISTED_RECORDS: usize = 5;

/// Lists the first few records in provider order; the rest are summarised.
pub fn format_commodity(
    records: &[CommodityRecord],
    region_name: Option<&str>,
    date: Option<&str>,
) -> String {
    if records.is_empty() {
        return NO_COMMODITY_DATA.to_string();
    }

    let mut out = String::from("Commodity prices");
    if let Some(region) = region_name {
        out.push_str(&format!(" in {region}"));
    }
    if let Some(date) = date {
        out.push_str(&format!(" for {date}"));
    }
    out.push_str(":\n\n");

    for (idx, record) in records.iter().take(MAX_LISTED_RECORDS).enumerate() {
        out.push_str(&format!(
            "{}. {} ({})\n",
            idx + 1,
            record.commodity,
            record.variety
        ));
        out.push_str(&format!("   Market: {}\n", record.market));
        out.push_str(&format!(
            "   Price Range: ₹{} - ₹{}\n",
            record.min_price, record.max_price
        ));
        out.push_str(&format!("   Modal Price: ₹{}\n\n", record.modal_price));
    }

    if records.len() > MAX_LISTED_RECORDS {
        out.push_str(&format!(
            "...and {} more items.\n",
            records.len() - MAX_LISTED_RECORDS
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> CommodityRecord {
        CommodityRecord {
            commodity: name.to_string(),
            variety: "Local".to_string(),
            market: "Rajkot".to_string(),
            min_price: "1000".to_string(),
            max_price: "1500".to_string(),
            modal_price: "1250".to_string(),
            state: Some("Gujarat".to_string()),
            district: Some("Rajkot".to_string()),
            arrival_date: None,
        }
    }

    #[test]
    fn empty_input_is_not_an_error() {
        assert_eq!(format_commodity(&[], Some("Surat"), None), NO_COMMODITY_DATA);
    }

    #[test]
    fn lists_five_and_counts_the_rest() {
        let records: Vec<_> = ["Onion", "Potato", "Tomato", "Wheat", "Cotton", "Garlic", "Bajra"]
            .into_iter()
            .map(record)
            .collect();

        let text = format_commodity(&records, Some("Rajkot, Gujarat"), Some("2024-03-15"));

        assert!(text.starts_with("Commodity prices in Rajkot, Gujarat for 2024-03-15:"));
        assert_eq!(text.matches("   Market: ").count(), 5);
        assert!(text.contains("5. Cotton (Local)"));
        assert!(!text.contains("Garlic"));
        assert!(text.contains("...and 2 more items."));
    }

    #[test]
    fn keeps_provider_order_and_prices() {
        let records = vec![record("Wheat"), record("Bajra")];
        let text = format_commodity(&records, None, None);

        assert!(text.starts_with("Commodity prices:\n\n1. Wheat (Local)"));
        assert!(text.contains("   Price Range: ₹1000 - ₹1500\n   Modal Price: ₹1250"));
        assert!(!text.contains("more items"));
    }
}
