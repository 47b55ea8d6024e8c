use anyhow::Result;
use chrono::{DateTime, Utc};

use super::forecast::Decision;
use super::horizon::Horizon;
use super::market::{Bar, EconomicEvent};
use super::pair::CurrencyPair;
use super::sentiment::ArticleSentiment;

// The core is pure and synchronous; these seams are where the surrounding
// layer does its I/O. Implementations may block internally.

/// Ordered price history for a pair.
pub trait BarSource: Send + Sync {
    /// Bars with `from <= timestamp <= to`, strictly increasing timestamps.
    fn bars(&self, pair: &CurrencyPair, from: DateTime<Utc>, to: DateTime<Utc>)
    -> Result<Vec<Bar>>;
}

/// Scheduled macroeconomic events.
pub trait CalendarSource: Send + Sync {
    /// Events for either leg of the pair with `from <= timestamp <= until`,
    /// ordered by timestamp.
    fn events(
        &self,
        pair: &CurrencyPair,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EconomicEvent>>;
}

/// Per-article sentiment records from the upstream news-analysis step.
pub trait SentimentSource: Send + Sync {
    /// Articles mentioning either leg of the pair with
    /// `from <= timestamp <= to`.
    fn articles(
        &self,
        pair: &CurrencyPair,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ArticleSentiment>>;
}

/// Append-only decision store. The forecast flow only ever appends; replay
/// is for offline backtesting and never feeds back into new decisions.
pub trait DecisionLog: Send + Sync {
    fn append(&self, decision: &Decision) -> Result<()>;

    /// Chronological decisions for a key, oldest first.
    fn replay(&self, pair: &CurrencyPair, horizon: Horizon) -> Result<Vec<Decision>>;
}
