//! Snapshot Aggregator - Reduces live P2P quotes to a market summary
//!
//! Buy and sell adverts are reduced independently to best/worst/average.
//! The spread compares the two side averages, which is an approximation of
//! the order book spread rather than a top-of-book figure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Quote, Side};

/// Statistics for one side of the market.
///
/// Every numeric field is `None` when the side had no usable quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    pub count: usize,
    pub best: Option<f64>,
    pub worst: Option<f64>,
    pub avg: Option<f64>,
}

impl SideStats {
    /// Reduce quote prices for `side`.
    ///
    /// Buyers prefer the lowest price, sellers the highest.
    pub fn from_prices(side: Side, prices: &[f64]) -> Self {
        if prices.is_empty() {
            return Self::default();
        }

        let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let avg = prices.iter().sum::<f64>() / prices.len() as f64;

        let (best, worst) = match side {
            Side::Buy => (min, max),
            Side::Sell => (max, min),
        };

        Self {
            count: prices.len(),
            best: Some(best),
            worst: Some(worst),
            avg: Some(avg),
        }
    }
}

/// Summary of one capture of the P2P market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub pair: String,
    pub source: String,
    pub buy: SideStats,
    pub sell: SideStats,
    /// `(buy_avg - sell_avg) / sell_avg * 100`
    pub spread_percent: Option<f64>,
    /// `(buy_avg + sell_avg) / 2`
    pub mid_rate: Option<f64>,
}

impl Snapshot {
    pub fn with_labels(mut self, pair: &str, source: &str) -> Self {
        self.pair = pair.to_string();
        self.source = source.to_string();
        self
    }
}

/// Summarize buy and sell adverts captured at `timestamp`.
///
/// Quotes with a non-finite or non-positive price are ignored.
pub fn summarize_at(
    buy_quotes: &[Quote],
    sell_quotes: &[Quote],
    timestamp: DateTime<Utc>,
) -> Snapshot {
    let buy = SideStats::from_prices(Side::Buy, &usable_prices(buy_quotes));
    let sell = SideStats::from_prices(Side::Sell, &usable_prices(sell_quotes));

    let (spread_percent, mid_rate) = match (buy.avg, sell.avg) {
        (Some(buy_avg), Some(sell_avg)) => (
            Some((buy_avg - sell_avg) / sell_avg * 100.0),
            Some((buy_avg + sell_avg) / 2.0),
        ),
        _ => (None, None),
    };

    Snapshot {
        timestamp,
        pair: String::new(),
        source: String::new(),
        buy,
        sell,
        spread_percent,
        mid_rate,
    }
}

/// Summarize adverts captured now
pub fn summarize(buy_quotes: &[Quote], sell_quotes: &[Quote]) -> Snapshot {
    summarize_at(buy_quotes, sell_quotes, Utc::now())
}

fn usable_prices(quotes: &[Quote]) -> Vec<f64> {
    quotes
        .iter()
        .map(|q| q.price)
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(side: Side, price: f64) -> Quote {
        Quote {
            side,
            price,
            min_amount: 5000.0,
            max_amount: 500000.0,
            available: 120.0,
            merchant: "merchant".to_string(),
            completion_rate: 98.0,
            recent_orders: 40,
            payment_methods: "14".to_string(),
            asset: "USDT".to_string(),
            fiat: "NGN".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_sides_are_absent_not_zero() {
        let snapshot = summarize(&[], &[]);

        assert_eq!(snapshot.buy.count, 0);
        assert_eq!(snapshot.sell.count, 0);
        assert_eq!(snapshot.buy, SideStats::default());
        assert_eq!(snapshot.sell, SideStats::default());
        assert!(snapshot.spread_percent.is_none());
        assert!(snapshot.mid_rate.is_none());
    }

    #[test]
    fn single_quote_each_side() {
        let snapshot = summarize(&[quote(Side::Buy, 1600.0)], &[quote(Side::Sell, 1550.0)]);

        assert_eq!(snapshot.buy.avg, Some(1600.0));
        assert_eq!(snapshot.sell.avg, Some(1550.0));
        assert_eq!(snapshot.mid_rate, Some(1575.0));
        let spread = snapshot.spread_percent.unwrap();
        assert!((spread - 3.2258).abs() < 1e-3);
    }

    #[test]
    fn best_and_worst_follow_side() {
        let buys = [
            quote(Side::Buy, 1610.0),
            quote(Side::Buy, 1595.0),
            quote(Side::Buy, 1620.0),
        ];
        let sells = [quote(Side::Sell, 1540.0), quote(Side::Sell, 1560.0)];
        let snapshot = summarize(&buys, &sells);

        assert_eq!(snapshot.buy.count, 3);
        assert_eq!(snapshot.buy.best, Some(1595.0));
        assert_eq!(snapshot.buy.worst, Some(1620.0));
        assert_eq!(snapshot.sell.best, Some(1560.0));
        assert_eq!(snapshot.sell.worst, Some(1540.0));
        assert_eq!(snapshot.sell.avg, Some(1550.0));
    }

    #[test]
    fn one_empty_side_leaves_spread_absent() {
        let snapshot = summarize(&[quote(Side::Buy, 1600.0)], &[]);

        assert_eq!(snapshot.buy.avg, Some(1600.0));
        assert!(snapshot.sell.avg.is_none());
        assert!(snapshot.spread_percent.is_none());
        assert!(snapshot.mid_rate.is_none());
    }

    #[test]
    fn unusable_prices_are_ignored() {
        let buys = [
            quote(Side::Buy, 0.0),
            quote(Side::Buy, f64::NAN),
            quote(Side::Buy, 1600.0),
        ];
        let snapshot = summarize(&buys, &[]);

        assert_eq!(snapshot.buy.count, 1);
        assert_eq!(snapshot.buy.avg, Some(1600.0));
    }

    #[test]
    fn labels_are_attached() {
        let snapshot = summarize(&[], &[]).with_labels("NGN/USDT", "Bybit P2P");
        assert_eq!(snapshot.pair, "NGN/USDT");
        assert_eq!(snapshot.source, "Bybit P2P");
    }
}
