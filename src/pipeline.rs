//! Run orchestration
//!
//! `HistoryPipeline` collects, merges, fills and exports the daily series.
//! `SnapshotPipeline` captures both sides of the P2P market and exports the
//! raw quotes plus their summary. Both refuse to write anything when no
//! usable record came back.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::persistence::DataSink;
use crate::snapshot::{summarize_at, Snapshot};
use crate::sources::{Collector, QuoteSource, SourceOutcome};
use crate::timeline::{fill_with, merge, GapPolicy, SeriesSummary};
use crate::types::{CurrencyPair, DailyPoint, DateWindow, Quote, Side};

/// Result of a history run
#[derive(Debug, Clone)]
pub struct HistoryReport {
    pub outcomes: Vec<SourceOutcome>,
    /// Valid observations before merging
    pub observations: usize,
    /// Distinct dates after merging
    pub timeline_len: usize,
    /// Merged dates falling inside the requested window
    pub observed_in_window: usize,
    pub summary: SeriesSummary,
    pub points: Vec<DailyPoint>,
}

pub struct HistoryPipeline {
    pair: CurrencyPair,
    collector: Collector,
}

impl HistoryPipeline {
    pub fn new(pair: CurrencyPair, collector: Collector) -> Self {
        Self { pair, collector }
    }

    pub async fn run(
        &self,
        window: &DateWindow,
        policy: GapPolicy,
        sink: &mut dyn DataSink,
    ) -> Result<HistoryReport> {
        info!(
            pair = %self.pair,
            start = %window.start,
            end = %window.end,
            sources = self.collector.len(),
            "📈 Building daily history"
        );

        let collection = self.collector.collect(window).await;
        let observations = collection.observations.len();
        let timeline = merge(collection.observations);

        if timeline.is_empty() {
            warn!(
                failed = collection.outcomes.iter().filter(|o| o.is_failed()).count(),
                "No usable observations from any source"
            );
            return Err(PipelineError::NoData.into());
        }

        let observed_in_window = timeline.iter().filter(|o| window.contains(o.date)).count();
        info!(
            observations,
            dates = timeline.len(),
            observed_in_window,
            days = window.days(),
            "Merged timeline"
        );

        let points = fill_with(&timeline, window.start, window.end, policy);
        if points.is_empty() {
            warn!("Every known observation falls after the requested window");
            return Err(PipelineError::NoData.into());
        }

        let summary = SeriesSummary::from_points(&points);
        sink.write_daily(&self.pair, window, &points)?;

        info!(
            total = summary.total,
            actual = summary.actual,
            estimated = summary.estimated(),
            gaps = summary.gaps,
            "✅ Daily series exported"
        );

        Ok(HistoryReport {
            outcomes: collection.outcomes,
            observations,
            timeline_len: timeline.len(),
            observed_in_window,
            summary,
            points,
        })
    }
}

/// Result of a snapshot run
#[derive(Debug, Clone)]
pub struct SnapshotReport {
    pub buy_quotes: Vec<Quote>,
    pub sell_quotes: Vec<Quote>,
    pub snapshot: Snapshot,
}

pub struct SnapshotPipeline {
    pair: CurrencyPair,
    source: Box<dyn QuoteSource>,
}

impl SnapshotPipeline {
    pub fn new(pair: CurrencyPair, source: Box<dyn QuoteSource>) -> Self {
        Self { pair, source }
    }

    pub async fn run(&self, sink: &mut dyn DataSink) -> Result<SnapshotReport> {
        info!(pair = %self.pair, source = self.source.name(), "📸 Capturing P2P market");

        let buy_quotes = self.fetch_side(Side::Buy).await;
        let sell_quotes = self.fetch_side(Side::Sell).await;

        if buy_quotes.is_empty() && sell_quotes.is_empty() {
            warn!("No quotes on either side");
            return Err(PipelineError::NoData.into());
        }

        let captured_at = Utc::now();
        let snapshot = summarize_at(&buy_quotes, &sell_quotes, captured_at)
            .with_labels(&self.pair.label(), self.source.name());

        let mut all_quotes = Vec::with_capacity(buy_quotes.len() + sell_quotes.len());
        all_quotes.extend_from_slice(&buy_quotes);
        all_quotes.extend_from_slice(&sell_quotes);

        sink.write_quotes(&self.pair, captured_at, &all_quotes)?;
        sink.write_snapshot(&self.pair, &snapshot)?;

        info!(
            buy = snapshot.buy.count,
            sell = snapshot.sell.count,
            buy_avg = ?snapshot.buy.avg,
            sell_avg = ?snapshot.sell.avg,
            spread_percent = ?snapshot.spread_percent,
            "✅ Snapshot exported"
        );

        Ok(SnapshotReport {
            buy_quotes,
            sell_quotes,
            snapshot,
        })
    }

    /// A failed side counts as empty
    async fn fetch_side(&self, side: Side) -> Vec<Quote> {
        match self.source.fetch_quotes(side).await {
            Ok(quotes) => {
                info!(side = %side, count = quotes.len(), "Fetched quotes");
                quotes
            }
            Err(e) => {
                warn!(side = %side, error = %format!("{:#}", e), "Quote fetch failed");
                Vec::new()
            }
        }
    }
}
