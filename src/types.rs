//! Core types used throughout RateFill
//!
//! Defines the observation, daily point and quote records shared by the
//! collectors, the timeline engine and the writers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency pair the pipeline tracks, e.g. NGN per USDT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Currency the rate is quoted in (NGN)
    pub quote: String,
    /// Asset being priced (USDT)
    pub base: String,
}

impl CurrencyPair {
    pub fn new(quote: &str, base: &str) -> Self {
        Self {
            quote: quote.to_uppercase(),
            base: base.to_uppercase(),
        }
    }

    /// Human label, e.g. "NGN/USDT"
    pub fn label(&self) -> String {
        format!("{}/{}", self.quote, self.base)
    }

    /// Lowercase stem used in output filenames, e.g. "ngn_usdt"
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}",
            self.quote.to_lowercase(),
            self.base.to_lowercase()
        )
    }
}

impl Default for CurrencyPair {
    fn default() -> Self {
        Self::new("NGN", "USDT")
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How much a source is trusted when two sources report the same day.
///
/// Ordering is significant: a higher tier replaces a lower one in the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    /// Yearly official averages (coarse, lags the parallel market)
    Official,
    /// Daily community-maintained market feed
    Market,
    /// Hand-curated parallel market table
    Curated,
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustTier::Official => write!(f, "official"),
            TrustTier::Market => write!(f, "market"),
            TrustTier::Curated => write!(f, "curated"),
        }
    }
}

/// A single dated rate reported by one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub rate: f64,
    pub source: String,
    pub trust: TrustTier,
}

impl Observation {
    /// Build an observation, rejecting missing, non-finite and non-positive rates
    pub fn new(date: NaiveDate, rate: f64, source: &str, trust: TrustTier) -> Option<Self> {
        let obs = Self {
            date,
            rate,
            source: source.to_string(),
            trust,
        };
        obs.is_valid().then_some(obs)
    }

    pub fn is_valid(&self) -> bool {
        self.rate.is_finite() && self.rate > 0.0
    }
}

/// Where a daily value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Directly observed on that day
    Actual,
    /// Linear blend of the surrounding observations
    Interpolated,
    /// Carried forward from the last observation
    Extrapolated,
    /// Before the first observation; no rate available
    Gap,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Actual => write!(f, "actual"),
            Provenance::Interpolated => write!(f, "interpolated"),
            Provenance::Extrapolated => write!(f, "extrapolated"),
            Provenance::Gap => write!(f, "gap"),
        }
    }
}

/// One day of the filled series.
///
/// `rate` is `None` only for `Provenance::Gap`; every other point carries a
/// positive rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub rate: Option<f64>,
    pub provenance: Provenance,
    pub source: String,
}

impl DailyPoint {
    pub fn is_gap(&self) -> bool {
        self.provenance == Provenance::Gap
    }
}

/// Marketplace side from the taker's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy the asset, pay fiat
    Buy,
    /// Sell the asset, receive fiat
    Sell,
}

impl Side {
    /// Side code used by the P2P listing API
    pub fn wire_code(&self) -> &'static str {
        match self {
            Side::Buy => "1",
            Side::Sell => "0",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// A live P2P advert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub side: Side,
    pub price: f64,
    pub min_amount: f64,
    pub max_amount: f64,
    pub available: f64,
    pub merchant: String,
    pub completion_rate: f64,
    pub recent_orders: u64,
    pub payment_methods: String,
    pub asset: String,
    pub fiat: String,
    pub timestamp: DateTime<Utc>,
}

/// Inclusive calendar range requested from the sources and the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// `None` when `end` precedes `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
