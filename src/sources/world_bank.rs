//! World Bank client for yearly official exchange rates
//!
//! The indicator API answers with `[meta, rows]`; each row carries a year
//! and a period-average rate that is pinned to January 1st of that year.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::WorldBankConfig;
use crate::sources::http::HttpFetcher;
use crate::sources::RateSource;
use crate::types::{DateWindow, Observation, TrustTier};

pub const WORLD_BANK_LABEL: &str = "World Bank";

pub struct WorldBankSource {
    http: Arc<HttpFetcher>,
    base_url: String,
    indicator: String,
    country_code: String,
    per_page: u32,
}

impl WorldBankSource {
    pub fn new(http: Arc<HttpFetcher>, config: &WorldBankConfig, country_code: &str) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            indicator: config.indicator.clone(),
            country_code: country_code.to_string(),
            per_page: config.per_page,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/country/{}/indicator/{}",
            self.base_url, self.country_code, self.indicator
        )
    }
}

#[async_trait]
impl RateSource for WorldBankSource {
    fn name(&self) -> &'static str {
        WORLD_BANK_LABEL
    }

    fn trust(&self) -> TrustTier {
        TrustTier::Official
    }

    async fn fetch(&self, window: &DateWindow) -> Result<Vec<Observation>> {
        let query = [
            ("format", "json".to_string()),
            ("per_page", self.per_page.to_string()),
            ("date", format!("{}:{}", window.start.year(), window.end.year())),
        ];

        let payload: Value = self.http.get_json(&self.url(), &query).await?;
        let observations = parse_payload(&payload)?;
        debug!(count = observations.len(), "Parsed yearly official rates");
        Ok(observations)
    }
}

/// Turn an indicator payload into observations, dropping rows without a
/// usable year or value. A payload without a row array is an API error.
pub fn parse_payload(payload: &Value) -> Result<Vec<Observation>> {
    let meta = payload.get(0);
    let error = meta.and_then(|m| m.get("message"));

    // `[meta, null]` is how the API reports a range with no data
    if error.is_none() && payload.get(1).is_some_and(Value::is_null) {
        return Ok(Vec::new());
    }

    let Some(rows) = payload.get(1).and_then(Value::as_array) else {
        let message = error
            .map(|m| m.to_string())
            .unwrap_or_else(|| "missing data rows".to_string());
        bail!("World Bank API error: {}", message);
    };

    let mut observations: Vec<Observation> = rows.iter().filter_map(parse_row).collect();
    observations.sort_by_key(|obs| obs.date);
    Ok(observations)
}

fn parse_row(row: &Value) -> Option<Observation> {
    let year: i32 = row.get("date")?.as_str()?.trim().parse().ok()?;
    let rate = row.get("value")?.as_f64()?;
    let date = NaiveDate::from_ymd_opt(year, 1, 1)?;
    Observation::new(date, rate, WORLD_BANK_LABEL, TrustTier::Official)
}
