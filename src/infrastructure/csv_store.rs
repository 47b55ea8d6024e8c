//! File-backed data sources: CSV bars, CSV calendar, JSON sentiment records,
//! and the append-only CSV decision log.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

use crate::domain::forecast::Decision;
use crate::domain::horizon::Horizon;
use crate::domain::market::{Bar, EconomicEvent};
use crate::domain::pair::CurrencyPair;
use crate::domain::ports::{BarSource, CalendarSource, DecisionLog, SentimentSource};
use crate::domain::sentiment::ArticleSentiment;

/// One-minute OHLC bars from a CSV file with a header row:
/// `timestamp,pair,open,high,low,close`.
pub struct CsvBarSource {
    path: PathBuf,
}

impl CsvBarSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BarSource for CsvBarSource {
    fn bars(
        &self,
        pair: &CurrencyPair,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open bar file {:?}", self.path))?;

        let mut bars = Vec::new();
        for record in reader.deserialize() {
            let bar: Bar = record.context("Failed to parse bar row")?;
            if &bar.pair == pair && bar.timestamp >= from && bar.timestamp <= to {
                bars.push(bar);
            }
        }
        bars.sort_by_key(|b| b.timestamp);

        debug!(pair = %pair, count = bars.len(), "bars loaded");
        Ok(bars)
    }
}

/// Economic calendar from a CSV file with a header row:
/// `timestamp,currency,importance`.
pub struct CsvEventSource {
    path: PathBuf,
}

impl CsvEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CalendarSource for CsvEventSource {
    fn events(
        &self,
        pair: &CurrencyPair,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EconomicEvent>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open calendar file {:?}", self.path))?;

        let mut events = Vec::new();
        for record in reader.deserialize() {
            let event: EconomicEvent = record.context("Failed to parse calendar row")?;
            if pair.involves(&event.currency)
                && event.timestamp >= from
                && event.timestamp <= until
            {
                events.push(event);
            }
        }
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

/// Per-article sentiment records from a JSON array file. JSON rather than CSV
/// because each record carries a per-currency sentiment map.
pub struct JsonSentimentSource {
    path: PathBuf,
}

impl JsonSentimentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SentimentSource for JsonSentimentSource {
    fn articles(
        &self,
        pair: &CurrencyPair,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ArticleSentiment>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read sentiment file {:?}", self.path))?;
        let all: Vec<ArticleSentiment> =
            serde_json::from_str(&content).context("Failed to parse sentiment JSON")?;

        let mut articles: Vec<ArticleSentiment> = all
            .into_iter()
            .filter(|a| a.timestamp >= from && a.timestamp <= to)
            .filter(|a| a.mentions(pair.base()) || a.mentions(pair.quote()))
            .collect();
        articles.sort_by_key(|a| a.timestamp);
        Ok(articles)
    }
}

/// Append-only decision log in one CSV file. Each append opens, writes one
/// row, and flushes, so concurrent processes interleave whole rows.
pub struct CsvDecisionLog {
    path: PathBuf,
}

impl CsvDecisionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DecisionLog for CsvDecisionLog {
    fn append(&self, decision: &Decision) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create decision log directory")?;
            }
        }

        let needs_header = !self.path.exists()
            || fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open decision log {:?}", self.path))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(decision)
            .context("Failed to serialize decision")?;
        writer.flush().context("Failed to flush decision log")?;

        debug!(pair = %decision.pair, horizon = %decision.horizon, "decision appended");
        Ok(())
    }

    fn replay(&self, pair: &CurrencyPair, horizon: Horizon) -> Result<Vec<Decision>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open decision log {:?}", self.path))?;
        let mut decisions = Vec::new();
        for record in reader.deserialize() {
            let decision: Decision = record.context("Failed to parse decision row")?;
            if &decision.pair == pair && decision.horizon == horizon {
                decisions.push(decision);
            }
        }
        decisions.sort_by_key(|d| d.timestamp);
        Ok(decisions)
    }
}

/// In-process decision log for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryDecisionLog {
    decisions: Mutex<Vec<Decision>>,
}

impl MemoryDecisionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionLog for MemoryDecisionLog {
    fn append(&self, decision: &Decision) -> Result<()> {
        let mut decisions = self
            .decisions
            .lock()
            .map_err(|_| anyhow::anyhow!("decision log mutex poisoned"))?;
        decisions.push(decision.clone());
        Ok(())
    }

    fn replay(&self, pair: &CurrencyPair, horizon: Horizon) -> Result<Vec<Decision>> {
        let decisions = self
            .decisions
            .lock()
            .map_err(|_| anyhow::anyhow!("decision log mutex poisoned"))?;
        Ok(decisions
            .iter()
            .filter(|d| &d.pair == pair && d.horizon == horizon)
            .cloned()
            .collect())
    }
}
