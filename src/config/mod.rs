//! Configuration management for RateFill
//!
//! Loads defaults, optional config files and environment variables via .env

mod types;

pub use types::*;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::error::PipelineError;
use crate::types::DateWindow;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub pair: PairConfig,
    pub http: HttpConfig,
    pub sources: SourcesConfig,
    pub interpolation: InterpolationConfig,
    pub p2p: P2pConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (RATEFILL__*)
            .add_source(Environment::with_prefix("RATEFILL").separator("__"));

        Self::from_builder(builder)
    }

    /// Built-in defaults only, no files or environment
    pub fn from_defaults() -> Result<Self> {
        Self::from_builder(Self::defaults()?)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            // Pair defaults
            .set_default("pair.quote", "NGN")?
            .set_default("pair.base", "USDT")?
            .set_default("pair.country_code", "NGA")?
            // HTTP defaults
            .set_default("http.timeout_secs", 30)?
            .set_default("http.min_delay_ms", 200)?
            .set_default(
                "http.user_agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
            )?
            // World Bank defaults
            .set_default("sources.world_bank.enabled", true)?
            .set_default("sources.world_bank.base_url", "https://api.worldbank.org/v2")?
            .set_default("sources.world_bank.indicator", "PA.NUS.FCRF")?
            .set_default("sources.world_bank.per_page", 100)?
            // Daily currency feed defaults
            .set_default("sources.currency_api.enabled", true)?
            .set_default(
                "sources.currency_api.url_templates",
                vec![
                    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@{date}/v1/currencies/{currency}.json",
                    "https://raw.githubusercontent.com/fawazahmed0/currency-api/1/{date}/currencies/{currency}.json",
                ],
            )?
            .set_default("sources.currency_api.reference_currency", "usd")?
            .set_default("sources.currency_api.start_year", 2020)?
            .set_default("sources.currency_api.sample_interval_days", 7)?
            // Curated table defaults
            .set_default("sources.known_rates.enabled", true)?
            // Interpolation defaults
            .set_default("interpolation.start_date", "2000-01-01")?
            .set_default("interpolation.gap_policy", "skip")?
            // P2P defaults
            .set_default("p2p.enabled", true)?
            .set_default("p2p.url", "https://api2.bybit.com/fiat/otc/item/online")?
            .set_default("p2p.page_size", 20)?
            // Persistence defaults
            .set_default("persistence.data_dir", "./data")?
            .set_default("persistence.csv_enabled", true)?
            .set_default("persistence.json_enabled", true)?
            // Logging defaults
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?;

        Ok(builder)
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> anyhow::Error {
            PipelineError::InvalidConfig(msg.to_string()).into()
        };

        if self.http.timeout_secs == 0 {
            return Err(invalid("http.timeout_secs must be > 0"));
        }
        if self.sources.currency_api.sample_interval_days == 0 {
            return Err(invalid("sources.currency_api.sample_interval_days must be > 0"));
        }
        if self.p2p.page_size == 0 {
            return Err(invalid("p2p.page_size must be > 0"));
        }
        if self.pair.quote.trim().is_empty() || self.pair.base.trim().is_empty() {
            return Err(invalid("pair.quote and pair.base are required"));
        }
        Ok(())
    }

    /// Interpolation window, with the end defaulting to today
    pub fn window(&self) -> Result<DateWindow> {
        let end = self
            .interpolation
            .end_date
            .unwrap_or_else(|| Utc::now().date_naive());
        window_between(self.interpolation.start_date, end)
    }

    /// Generate a one-line digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "pair={} start={} end={} gap_policy={} world_bank={} currency_api={} known_rates={} p2p={} data_dir={}",
            self.pair.pair(),
            self.interpolation.start_date,
            self.interpolation
                .end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "today".to_string()),
            self.interpolation.gap_policy,
            self.sources.world_bank.enabled,
            self.sources.currency_api.enabled,
            self.sources.known_rates.enabled,
            self.p2p.enabled,
            self.persistence.data_dir
        )
    }
}

/// Validated inclusive window
pub fn window_between(start: NaiveDate, end: NaiveDate) -> Result<DateWindow> {
    DateWindow::new(start, end).ok_or_else(|| PipelineError::InvalidRange { start, end }.into())
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
