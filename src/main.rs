//! FX Forecast Advisor CLI
//!
//! One-shot forecasts and decision-log backtests over file-backed data
//! sources. Tuning comes from the environment (see `config`); data locations
//! come from the command line.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fxadvisor::application::advisor::{Advisor, ForecastRequest};
use fxadvisor::config::AdvisorEnvConfig;
use fxadvisor::domain::forecast::PolicyKind;
use fxadvisor::domain::horizon::Horizon;
use fxadvisor::domain::market::EconomicEvent;
use fxadvisor::domain::pair::CurrencyPair;
use fxadvisor::domain::ports::{CalendarSource, SentimentSource};
use fxadvisor::domain::sentiment::ArticleSentiment;
use fxadvisor::infrastructure::csv_store::{
    CsvBarSource, CsvDecisionLog, CsvEventSource, JsonSentimentSource,
};
use fxadvisor::infrastructure::model_store::FileModelStore;

#[derive(Parser)]
#[command(author, version, about = "FX forecast and decision advisor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce one forecast and append it to the decision log
    Forecast {
        /// Currency pair, e.g. USDINR
        #[arg(short, long, default_value = "USDINR")]
        pair: String,

        /// Forecast horizon (30m, 1h, 2h, 4h)
        #[arg(long, default_value = "1h")]
        horizon: String,

        /// CSV file with one-minute bars
        #[arg(long, default_value = "data/bars.csv")]
        bars: String,

        /// CSV file with the economic calendar
        #[arg(long)]
        calendar: Option<String>,

        /// JSON file with per-article sentiment records
        #[arg(long)]
        sentiment: Option<String>,

        /// CSV decision log to append to
        #[arg(long, default_value = "data/decisions.csv")]
        decisions: String,

        /// Decision policy override (expected, prob)
        #[arg(long)]
        policy: Option<String>,

        /// Spread cost override in basis points
        #[arg(long)]
        spread_bps: Option<f64>,

        /// Probability threshold override for the prob policy
        #[arg(long)]
        prob_threshold: Option<f64>,

        /// Embargo window override in minutes (0 disables)
        #[arg(long)]
        embargo_minutes: Option<i64>,

        /// Model identifier override
        #[arg(long)]
        model: Option<String>,

        /// Skip news fusion and use the technical forecast alone
        #[arg(long)]
        no_hybrid: bool,

        /// Forecast time (RFC 3339); defaults to the current time
        #[arg(long)]
        at: Option<String>,
    },
    /// Score logged decisions against realized prices
    Backtest {
        /// Comma-separated currency pairs
        #[arg(short, long, default_value = "USDINR")]
        pairs: String,

        /// Forecast horizon (30m, 1h, 2h, 4h)
        #[arg(long, default_value = "1h")]
        horizon: String,

        /// Trailing window of decisions to score, in hours
        #[arg(long, default_value = "24")]
        lookback_hours: i64,

        /// Spread cost in basis points
        #[arg(long, default_value = "2.0")]
        spread_bps: f64,

        /// CSV file with one-minute bars
        #[arg(long, default_value = "data/bars.csv")]
        bars: String,

        /// CSV decision log to replay
        #[arg(long, default_value = "data/decisions.csv")]
        decisions: String,

        /// Evaluation time (RFC 3339); defaults to the current time
        #[arg(long)]
        at: Option<String>,
    },
}

/// Calendar adapter used when no calendar file is given.
struct NoCalendar;

impl CalendarSource for NoCalendar {
    fn events(
        &self,
        _pair: &CurrencyPair,
        _from: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> Result<Vec<EconomicEvent>> {
        Ok(Vec::new())
    }
}

/// Sentiment adapter used when no sentiment file is given.
struct NoNews;

impl SentimentSource for NoNews {
    fn articles(
        &self,
        _pair: &CurrencyPair,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<ArticleSentiment>> {
        Ok(Vec::new())
    }
}

fn parse_at(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .context("Failed to parse --at as RFC 3339")?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = AdvisorEnvConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Forecast {
            pair,
            horizon,
            bars,
            calendar,
            sentiment,
            decisions,
            policy,
            spread_bps,
            prob_threshold,
            embargo_minutes,
            model,
            no_hybrid,
            at,
        } => {
            let pair = CurrencyPair::from_str(&pair)?;
            let horizon = Horizon::from_str(&horizon)?;
            let now = parse_at(at.as_deref())?;

            let calendar: Arc<dyn CalendarSource> = match calendar {
                Some(path) => Arc::new(CsvEventSource::new(path)),
                None => Arc::new(NoCalendar),
            };
            let news: Arc<dyn SentimentSource> = match sentiment {
                Some(path) => Arc::new(JsonSentimentSource::new(path)),
                None => Arc::new(NoNews),
            };

            let advisor = Advisor::new(
                Arc::new(CsvBarSource::new(bars)),
                calendar,
                news,
                Arc::new(CsvDecisionLog::new(decisions)),
                Arc::new(FileModelStore::new(config.models_dir.clone())),
                config.advisor_settings(),
            );

            let mut request = ForecastRequest::new(pair, horizon);
            request.policy = policy.as_deref().map(PolicyKind::from_str).transpose()?;
            request.spread_bps = spread_bps;
            request.prob_threshold = prob_threshold;
            request.embargo_minutes = embargo_minutes;
            request.model_id = model;
            request.use_hybrid = !no_hybrid;

            let response = advisor.forecast(&request, now)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Backtest {
            pairs,
            horizon,
            lookback_hours,
            spread_bps,
            bars,
            decisions,
            at,
        } => {
            let horizon = Horizon::from_str(&horizon)?;
            let now = parse_at(at.as_deref())?;

            let advisor = Advisor::new(
                Arc::new(CsvBarSource::new(bars)),
                Arc::new(NoCalendar),
                Arc::new(NoNews),
                Arc::new(CsvDecisionLog::new(decisions)),
                Arc::new(FileModelStore::new(config.models_dir.clone())),
                config.advisor_settings(),
            );

            let mut metrics = Vec::new();
            for raw in pairs.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let pair = match CurrencyPair::from_str(raw) {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(pair = raw, error = %e, "skipping invalid pair");
                        continue;
                    }
                };
                // One bad key must not sink the rest of the batch.
                match advisor.backtest(&pair, horizon, lookback_hours, spread_bps, now) {
                    Ok(metric) => {
                        info!(pair = %pair, trades = metric.trade_count, "backtest scored");
                        metrics.push(metric);
                    }
                    Err(e) => warn!(pair = %pair, error = %e, "backtest skipped"),
                }
            }

            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
    }

    Ok(())
}
