//! CSV/JSON Persistence Module
//!
//! Writes the filled daily series, raw P2P quotes and snapshots. Every
//! export is a pretty-printed JSON array plus a CSV whose rows match it
//! one-to-one; CSV columns start with the date (or capture timestamp) and
//! continue in alphabetical order.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PersistenceConfig;
use crate::snapshot::Snapshot;
use crate::types::{CurrencyPair, DailyPoint, DateWindow, Provenance, Quote, Side};

/// Daily point as a CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub provenance: Provenance,
    pub rate: Option<f64>,
    pub source: String,
}

impl From<&DailyPoint> for DailyRecord {
    fn from(point: &DailyPoint) -> Self {
        Self {
            date: point.date,
            provenance: point.provenance,
            rate: point.rate,
            source: point.source.clone(),
        }
    }
}

/// Quote as a CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub timestamp: DateTime<Utc>,
    pub asset: String,
    pub available: f64,
    pub completion_rate: f64,
    pub fiat: String,
    pub max_amount: f64,
    pub merchant: String,
    pub min_amount: f64,
    pub payment_methods: String,
    pub price: f64,
    pub recent_orders: u64,
    pub side: Side,
}

impl From<&Quote> for QuoteRecord {
    fn from(quote: &Quote) -> Self {
        Self {
            timestamp: quote.timestamp,
            asset: quote.asset.clone(),
            available: quote.available,
            completion_rate: quote.completion_rate,
            fiat: quote.fiat.clone(),
            max_amount: quote.max_amount,
            merchant: quote.merchant.clone(),
            min_amount: quote.min_amount,
            payment_methods: quote.payment_methods.clone(),
            price: quote.price,
            recent_orders: quote.recent_orders,
            side: quote.side,
        }
    }
}

/// Destination for run outputs
pub trait DataSink {
    fn write_daily(
        &mut self,
        pair: &CurrencyPair,
        window: &DateWindow,
        points: &[DailyPoint],
    ) -> Result<()>;

    fn write_quotes(
        &mut self,
        pair: &CurrencyPair,
        captured_at: DateTime<Utc>,
        quotes: &[Quote],
    ) -> Result<()>;

    fn write_snapshot(&mut self, pair: &CurrencyPair, snapshot: &Snapshot) -> Result<()>;
}

/// Filename stem for a daily export, e.g. `ngn_usdt_daily_2000_2026`
pub fn daily_stem(pair: &CurrencyPair, window: &DateWindow) -> String {
    format!(
        "{}_daily_{}_{}",
        pair.file_stem(),
        window.start.year(),
        window.end.year()
    )
}

fn capture_tag(captured_at: DateTime<Utc>) -> String {
    captured_at.format("%Y%m%d_%H%M%S").to_string()
}

/// Writes JSON and CSV files into a data directory
pub struct FileSink {
    data_dir: PathBuf,
    csv_enabled: bool,
    json_enabled: bool,
    written: Vec<PathBuf>,
}

impl FileSink {
    pub fn new(config: &PersistenceConfig) -> Result<Self> {
        let data_dir = PathBuf::from(&config.data_dir);

        // Create directory if it doesn't exist
        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(Self {
            data_dir,
            csv_enabled: config.csv_enabled,
            json_enabled: config.json_enabled,
            written: Vec::new(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Every file written so far, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, filename: &str, value: &T) -> Result<()> {
        let path = self.data_dir.join(filename);
        let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Saved JSON");
        self.written.push(path);
        Ok(())
    }

    fn write_csv<T: Serialize>(&mut self, filename: &str, rows: &[T]) -> Result<()> {
        let path = self.data_dir.join(filename);
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        for row in rows {
            writer.serialize(row).context("Failed to write CSV record")?;
        }
        writer.flush().context("Failed to flush CSV writer")?;

        info!(path = %path.display(), rows = rows.len(), "Saved CSV");
        self.written.push(path);
        Ok(())
    }
}

impl DataSink for FileSink {
    fn write_daily(
        &mut self,
        pair: &CurrencyPair,
        window: &DateWindow,
        points: &[DailyPoint],
    ) -> Result<()> {
        let stem = daily_stem(pair, window);
        if self.json_enabled {
            self.write_json(&format!("{}.json", stem), points)?;
        }
        if self.csv_enabled {
            let rows: Vec<DailyRecord> = points.iter().map(DailyRecord::from).collect();
            self.write_csv(&format!("{}.csv", stem), &rows)?;
        }
        Ok(())
    }

    fn write_quotes(
        &mut self,
        pair: &CurrencyPair,
        captured_at: DateTime<Utc>,
        quotes: &[Quote],
    ) -> Result<()> {
        let stem = format!("{}_p2p_quotes_{}", pair.file_stem(), capture_tag(captured_at));
        if self.json_enabled {
            self.write_json(&format!("{}.json", stem), quotes)?;
        }
        if self.csv_enabled {
            let rows: Vec<QuoteRecord> = quotes.iter().map(QuoteRecord::from).collect();
            self.write_csv(&format!("{}.csv", stem), &rows)?;
        }
        Ok(())
    }

    fn write_snapshot(&mut self, pair: &CurrencyPair, snapshot: &Snapshot) -> Result<()> {
        let filename = format!(
            "{}_p2p_summary_{}.json",
            pair.file_stem(),
            capture_tag(snapshot.timestamp)
        );
        self.write_json(&filename, snapshot)
    }
}

/// Keeps outputs in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub daily: Vec<DailyPoint>,
    pub quotes: Vec<Quote>,
    pub snapshots: Vec<Snapshot>,
}

impl DataSink for MemorySink {
    fn write_daily(
        &mut self,
        _pair: &CurrencyPair,
        _window: &DateWindow,
        points: &[DailyPoint],
    ) -> Result<()> {
        self.daily.extend_from_slice(points);
        Ok(())
    }

    fn write_quotes(
        &mut self,
        _pair: &CurrencyPair,
        _captured_at: DateTime<Utc>,
        quotes: &[Quote],
    ) -> Result<()> {
        self.quotes.extend_from_slice(quotes);
        Ok(())
    }

    fn write_snapshot(&mut self, _pair: &CurrencyPair, snapshot: &Snapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}
