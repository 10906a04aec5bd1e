//! Configuration section types

use chrono::NaiveDate;
use serde::Deserialize;

use crate::timeline::GapPolicy;
use crate::types::CurrencyPair;

#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    /// Currency the rate is quoted in
    pub quote: String,
    /// Asset being priced
    pub base: String,
    /// ISO3 country code used by the yearly official-rate API
    pub country_code: String,
}

impl PairConfig {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.quote, &self.base)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Connect + read timeout applied to every request
    pub timeout_secs: u64,
    /// Minimum spacing between two consecutive requests
    pub min_delay_ms: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub world_bank: WorldBankConfig,
    pub currency_api: CurrencyApiConfig,
    pub known_rates: KnownRatesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldBankConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Official exchange rate indicator, LCU per USD period average
    pub indicator: String,
    pub per_page: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyApiConfig {
    pub enabled: bool,
    /// Mirrors tried in order; `{date}` and `{currency}` are substituted
    pub url_templates: Vec<String>,
    /// Currency the daily feed is keyed by (the pair's quote is looked up inside it)
    pub reference_currency: String,
    /// First year to sample
    pub start_year: i32,
    /// Days between two sampled dates
    pub sample_interval_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnownRatesConfig {
    pub enabled: bool,
    /// Optional `date,rate` CSV replacing the built-in parallel market table
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterpolationConfig {
    pub start_date: NaiveDate,
    /// Defaults to today (UTC) when absent
    pub end_date: Option<NaiveDate>,
    pub gap_policy: GapPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct P2pConfig {
    pub enabled: bool,
    pub url: String,
    /// Fixed page size; only the first page is requested
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Data directory
    pub data_dir: String,
    pub csv_enabled: bool,
    pub json_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}
