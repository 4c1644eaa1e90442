use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use mausam_core::CommodityRecord;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::env_string;
use crate::{CommodityProvider, CommodityQuery};

const DEFAULT_BASE_URL: &str = "https://api.data.gov.in";
/// Daily mandi prices (Agmarknet) resource on data.gov.in.
const RESOURCE_ID: &str = "35985678-0d79-46b4-9ed6-6f13308a1d24";
const PAGE_LIMIT: &str = "100";

#[derive(Debug, Clone)]
pub struct DataGovCommodityClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordsPage {
    #[serde(default)]
    records: Vec<CommodityRecord>,
}

impl DataGovCommodityClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .build()
            .context("failed to build commodity HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(
            env_string("MAUSAM_COMMODITY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            env_string("MAUSAM_COMMODITY_API_KEY"),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// data.gov.in filters dates as `dd/mm/yyyy`.
fn arrival_date_filter(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn filter_params(query: &CommodityQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("format", "json".to_string()), ("limit", PAGE_LIMIT.to_string())];
    if let Some(state) = query.state.as_deref() {
        params.push(("filters[State]", state.to_string()));
    }
    if let Some(district) = query.district.as_deref() {
        params.push(("filters[District]", district.to_string()));
    }
    if let Some(date) = query.date {
        params.push(("filters[Arrival_Date]", arrival_date_filter(date)));
    }
    params
}

#[async_trait]
impl CommodityProvider for DataGovCommodityClient {
    async fn fetch_commodity_prices(&self, query: &CommodityQuery) -> Result<Vec<CommodityRecord>> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("MAUSAM_COMMODITY_API_KEY is not configured");
        };

        debug!(
            state = ?query.state,
            district = ?query.district,
            date = ?query.date,
            "fetching mandi prices"
        );

        let response = self
            .http
            .get(format!("{}/resource/{}", self.base_url, RESOURCE_ID))
            .query(&[("api-key", api_key)])
            .query(&filter_params(query))
            .timeout(query.timeout)
            .send()
            .await
            .context("commodity request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("commodity service returned {}", status.as_u16());
        }

        let page: RecordsPage = response
            .json()
            .await
            .context("commodity response parse failed")?;
        Ok(page.records)
    }
}
