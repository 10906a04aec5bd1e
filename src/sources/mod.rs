//! Observation and quote sources (World Bank, daily feed, curated table, P2P)
//!
//! Every network source is reached through one throttled [`HttpFetcher`].
//! The [`Collector`] runs the rate sources one after another and keeps
//! going when one of them fails.

mod bybit_p2p;
mod currency_api;
pub mod http;
mod known_rates;
mod world_bank;

pub use bybit_p2p::{parse_listing, BybitP2pSource, BYBIT_P2P_LABEL};
pub use currency_api::{parse_rate, sample_dates, CurrencyApiSource, CURRENCY_API_LABEL};
pub use http::{HttpFetcher, Throttle};
pub use known_rates::{KnownRatesSource, KNOWN_RATES_LABEL, PARALLEL_MARKET_RATES};
pub use world_bank::{parse_payload as parse_world_bank_payload, WorldBankSource, WORLD_BANK_LABEL};

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::types::{DateWindow, Observation, Quote, Side, TrustTier};

/// Trait for dated rate sources
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Source label carried by its observations
    fn name(&self) -> &'static str;

    /// Tier used when another source reports the same day
    fn trust(&self) -> TrustTier;

    /// Observations relevant to `window`
    async fn fetch(&self, window: &DateWindow) -> Result<Vec<Observation>>;
}

/// Trait for live marketplace quote sources
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// First page of adverts for one side
    async fn fetch_quotes(&self, side: Side) -> Result<Vec<Quote>>;
}

/// What one source contributed to a run
#[derive(Debug, Clone, PartialEq)]
pub enum SourceStatus {
    Collected(usize),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    pub name: String,
    pub trust: TrustTier,
    pub status: SourceStatus,
}

impl SourceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, SourceStatus::Failed(_))
    }
}

/// Raw observations from every source plus per-source outcomes
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub observations: Vec<Observation>,
    pub outcomes: Vec<SourceOutcome>,
}

impl Collection {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }
}

/// Runs rate sources sequentially
#[derive(Default)]
pub struct Collector {
    sources: Vec<Box<dyn RateSource>>,
}

impl Collector {
    pub fn new(sources: Vec<Box<dyn RateSource>>) -> Self {
        Self { sources }
    }

    pub fn push(&mut self, source: Box<dyn RateSource>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Fetch from every source. A failing source contributes nothing and
    /// the remaining sources still run.
    pub async fn collect(&self, window: &DateWindow) -> Collection {
        let mut collection = Collection::default();

        for source in &self.sources {
            let name = source.name();
            info!(source = %name, "Fetching observations...");

            let status = match source.fetch(window).await {
                Ok(batch) => {
                    let before = collection.observations.len();
                    collection
                        .observations
                        .extend(batch.into_iter().filter(Observation::is_valid));
                    let count = collection.observations.len() - before;
                    info!(source = %name, count, "Collected observations");
                    SourceStatus::Collected(count)
                }
                Err(e) => {
                    let reason = format!("{:#}", e);
                    warn!(source = %name, error = %reason, "Source unavailable, continuing without it");
                    SourceStatus::Failed(reason)
                }
            };

            collection.outcomes.push(SourceOutcome {
                name: name.to_string(),
                trust: source.trust(),
                status,
            });
        }

        collection
    }
}

/// Build the enabled rate sources from configuration
pub fn build_rate_sources(config: &AppConfig, http: Arc<HttpFetcher>) -> Result<Collector> {
    let mut collector = Collector::default();
    let sources = &config.sources;

    if sources.world_bank.enabled {
        collector.push(Box::new(WorldBankSource::new(
            Arc::clone(&http),
            &sources.world_bank,
            &config.pair.country_code,
        )));
    }

    if sources.known_rates.enabled {
        let table = match &sources.known_rates.file {
            Some(path) => KnownRatesSource::from_csv_path(Path::new(path))
                .with_context(|| format!("Failed to load known rates from {}", path))?,
            None => KnownRatesSource::parallel_market(),
        };
        collector.push(Box::new(table));
    }

    if sources.currency_api.enabled {
        collector.push(Box::new(CurrencyApiSource::new(
            Arc::clone(&http),
            &sources.currency_api,
            &config.pair.quote,
        )));
    }

    Ok(collector)
}
