//! Daily community currency feed (fawazahmed0/currency-api)
//!
//! One JSON document per day keyed by reference currency. The range is
//! sampled every `sample_interval_days`; each sample tries the configured
//! mirrors in order and a day no mirror can serve is simply absent.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::CurrencyApiConfig;
use crate::sources::http::HttpFetcher;
use crate::sources::RateSource;
use crate::types::{DateWindow, Observation, TrustTier};

pub const CURRENCY_API_LABEL: &str = "fawazahmed0/currency-api";

pub struct CurrencyApiSource {
    http: Arc<HttpFetcher>,
    url_templates: Vec<String>,
    reference: String,
    quote: String,
    start_year: i32,
    interval_days: u32,
}

impl CurrencyApiSource {
    pub fn new(http: Arc<HttpFetcher>, config: &CurrencyApiConfig, quote: &str) -> Self {
        Self {
            http,
            url_templates: config.url_templates.clone(),
            reference: config.reference_currency.to_lowercase(),
            quote: quote.to_lowercase(),
            start_year: config.start_year,
            interval_days: config.sample_interval_days,
        }
    }

    fn urls_for(&self, date: NaiveDate) -> Vec<String> {
        let day = date.format("%Y-%m-%d").to_string();
        self.url_templates
            .iter()
            .map(|template| {
                template
                    .replace("{date}", &day)
                    .replace("{currency}", &self.reference)
            })
            .collect()
    }

    async fn fetch_day(&self, date: NaiveDate) -> Option<Observation> {
        for url in self.urls_for(date) {
            match self.http.get_json_optional::<Value>(&url).await {
                Ok(Some(payload)) => {
                    if let Some(rate) = parse_rate(&payload, &self.reference, &self.quote) {
                        return Observation::new(date, rate, CURRENCY_API_LABEL, TrustTier::Market);
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(url = %url, error = %e, "Mirror failed"),
            }
        }
        None
    }
}

#[async_trait]
impl RateSource for CurrencyApiSource {
    fn name(&self) -> &'static str {
        CURRENCY_API_LABEL
    }

    fn trust(&self) -> TrustTier {
        TrustTier::Market
    }

    async fn fetch(&self, window: &DateWindow) -> Result<Vec<Observation>> {
        let dates = sample_dates(window, self.start_year, self.interval_days);
        debug!(samples = dates.len(), "Sampling daily feed");

        let mut observations = Vec::new();
        for date in dates {
            if let Some(obs) = self.fetch_day(date).await {
                observations.push(obs);
            }
        }
        Ok(observations)
    }
}

/// Dates to request: every `interval_days` from the later of the window
/// start and January 1st of `start_year`, up to the window end
pub fn sample_dates(window: &DateWindow, start_year: i32, interval_days: u32) -> Vec<NaiveDate> {
    let floor = NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap_or(window.start);
    let mut current = window.start.max(floor);
    let step = Duration::days(i64::from(interval_days.max(1)));

    let mut dates = Vec::new();
    while current <= window.end {
        dates.push(current);
        current += step;
    }
    dates
}

/// Rate of `quote` inside a payload keyed by `reference`
pub fn parse_rate(payload: &Value, reference: &str, quote: &str) -> Option<f64> {
    payload
        .get(reference)?
        .get(quote)?
        .as_f64()
        .filter(|rate| rate.is_finite() && *rate > 0.0)
}
