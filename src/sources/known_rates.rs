//! Hand-curated rate table
//!
//! Parallel market rates taken from news reports, which track P2P prices
//! more closely than the official series. The table is injected so callers
//! can replace it with their own `date,rate` CSV.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use crate::sources::RateSource;
use crate::types::{DateWindow, Observation, TrustTier};

pub const KNOWN_RATES_LABEL: &str = "Historical parallel market (estimated)";

/// Approximate NGN per USD parallel market rates
pub const PARALLEL_MARKET_RATES: &[(&str, f64)] = &[
    ("2020-01-01", 362.0),
    ("2020-03-01", 380.0),
    ("2020-06-01", 450.0),
    ("2020-12-01", 480.0),
    ("2021-01-01", 475.0),
    ("2021-06-01", 502.0),
    ("2021-12-01", 565.0),
    ("2022-01-01", 570.0),
    ("2022-06-01", 615.0),
    ("2022-12-01", 755.0),
    ("2023-01-01", 755.0),
    ("2023-06-01", 760.0),
    ("2023-06-15", 770.0), // CBN float announcement
    ("2023-07-01", 820.0),
    ("2023-08-01", 900.0),
    ("2023-09-01", 940.0),
    ("2023-10-01", 1050.0),
    ("2023-11-01", 1180.0),
    ("2023-12-01", 1150.0),
    ("2024-01-01", 1350.0),
    ("2024-02-01", 1550.0),
    ("2024-03-01", 1600.0),
];

#[derive(Debug, Deserialize)]
struct KnownRateRow {
    date: NaiveDate,
    rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct KnownRatesSource {
    table: BTreeMap<NaiveDate, f64>,
}

impl KnownRatesSource {
    pub fn new(table: BTreeMap<NaiveDate, f64>) -> Self {
        Self { table }
    }

    /// Built-in parallel market table
    pub fn parallel_market() -> Self {
        let table = PARALLEL_MARKET_RATES
            .iter()
            .filter_map(|(date, rate)| {
                NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .ok()
                    .map(|d| (d, *rate))
            })
            .collect();
        Self::new(table)
    }

    /// Load a `date,rate` CSV with a header row.
    ///
    /// A file that cannot be opened is an error. Malformed rows are skipped
    /// with a warning and the remaining rows are kept.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open known rates file {}", path.display()))?;

        let mut table = BTreeMap::new();
        for row in reader.deserialize::<KnownRateRow>() {
            match row {
                Ok(row) => {
                    table.insert(row.date, row.rate);
                }
                Err(e) => warn!(
                    file = %path.display(),
                    line = e.position().map(|p| p.line()),
                    error = %e,
                    "Skipping malformed known rate row"
                ),
            }
        }
        Ok(Self::new(table))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl RateSource for KnownRatesSource {
    fn name(&self) -> &'static str {
        KNOWN_RATES_LABEL
    }

    fn trust(&self) -> TrustTier {
        TrustTier::Curated
    }

    /// The whole table is returned; entries outside the window still anchor
    /// interpolation at its edges
    async fn fetch(&self, _window: &DateWindow) -> Result<Vec<Observation>> {
        Ok(self
            .table
            .iter()
            .filter_map(|(&date, &rate)| {
                Observation::new(date, rate, KNOWN_RATES_LABEL, TrustTier::Curated)
            })
            .collect())
    }
}
