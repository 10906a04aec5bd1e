//! RateFill command line
//!
//! `ratefill history` builds the filled daily series, `ratefill snapshot`
//! captures the live P2P market. Exit code 2 means the run produced no
//! data and wrote nothing.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ratefill::config::{window_between, AppConfig, LoggingConfig};
use ratefill::error::PipelineError;
use ratefill::persistence::FileSink;
use ratefill::pipeline::{HistoryPipeline, SnapshotPipeline};
use ratefill::sources::{build_rate_sources, BybitP2pSource, HttpFetcher};
use ratefill::timeline::GapPolicy;

/// Daily exchange-rate history and P2P market snapshots
#[derive(Debug, Parser)]
#[command(name = "ratefill", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Collect historical rates and export a gap-free daily series
    History {
        /// First day of the series (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the series (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Days before the first observation: skip or mark
        #[arg(long)]
        gap_policy: Option<GapPolicy>,
    },
    /// Capture current P2P buy and sell adverts
    Snapshot,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging);
    info!("🚀 RateFill starting");
    info!("Config: {}", config.digest());

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<PipelineError>() == Some(&PipelineError::NoData) => {
            warn!("{}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    let http = Arc::new(HttpFetcher::new(&config.http)?);
    let mut sink = FileSink::new(&config.persistence)?;
    let pair = config.pair.pair();

    match command {
        Command::History {
            start,
            end,
            gap_policy,
        } => {
            let default_window = config.window()?;
            let window = window_between(
                start.unwrap_or(default_window.start),
                end.unwrap_or(default_window.end),
            )?;
            let policy = gap_policy.unwrap_or(config.interpolation.gap_policy);

            let collector = build_rate_sources(&config, Arc::clone(&http))?;
            let pipeline = HistoryPipeline::new(pair, collector);
            let report = pipeline.run(&window, policy, &mut sink).await?;

            for outcome in report.outcomes.iter().filter(|o| o.is_failed()) {
                warn!(source = %outcome.name, "Source contributed nothing this run");
            }

            let summary = &report.summary;
            info!("📊 Daily series summary");
            info!(
                "  Range: {} -> {}",
                summary.first_date.map(|d| d.to_string()).unwrap_or_default(),
                summary.last_date.map(|d| d.to_string()).unwrap_or_default()
            );
            info!(
                "  Points: {} ({} actual, {} estimated, {} gaps)",
                summary.total,
                summary.actual,
                summary.estimated(),
                summary.gaps
            );
            info!("  Yearly progression:");
            for (year, rate) in &summary.yearly_open {
                info!("    {}: {:.2}", year, rate);
            }
        }
        Command::Snapshot => {
            if !config.p2p.enabled {
                warn!("P2P snapshots are disabled in configuration");
                return Ok(());
            }

            let source = BybitP2pSource::new(
                Arc::clone(&http),
                &config.p2p,
                &config.pair.base,
                &config.pair.quote,
            );
            let pipeline = SnapshotPipeline::new(pair, Box::new(source));
            let report = pipeline.run(&mut sink).await?;

            let snapshot = &report.snapshot;
            info!("📊 P2P market summary ({})", snapshot.pair);
            for (label, stats) in [("Buy", &snapshot.buy), ("Sell", &snapshot.sell)] {
                match (stats.best, stats.avg, stats.worst) {
                    (Some(best), Some(avg), Some(worst)) => info!(
                        "  {}: {} adverts, best {:.2}, avg {:.2}, worst {:.2}",
                        label, stats.count, best, avg, worst
                    ),
                    _ => info!("  {}: no adverts", label),
                }
            }
            if let (Some(mid), Some(spread)) = (snapshot.mid_rate, snapshot.spread_percent) {
                info!("  Mid rate: {:.2} {}, spread {:.2}%", mid, config.pair.quote, spread);
            }
        }
    }

    info!("Output directory: {}", sink.data_dir().display());
    for path in sink.written() {
        info!("  Wrote {}", path.display());
    }

    Ok(())
}
