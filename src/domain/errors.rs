use chrono::{DateTime, Utc};
use thiserror::Error;

use super::horizon::Horizon;
use super::pair::CurrencyPair;

/// Failure taxonomy of the forecast and backtest flows.
///
/// Absent sentiment is deliberately not represented here: it is a valid
/// state (`SentimentSignal::Absent`) recovered locally by the fusion engine,
/// not a failure.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("insufficient data for {pair}/{horizon} at {timestamp}: {detail}")]
    InsufficientData {
        pair: CurrencyPair,
        horizon: Horizon,
        timestamp: DateTime<Utc>,
        detail: String,
    },

    /// Guarded but normally unreachable: the predictor selection chain is
    /// total and always ends in the baseline.
    #[error("no predictor resolvable for {pair}/{horizon} at {timestamp}")]
    ModelUnavailable {
        pair: CurrencyPair,
        horizon: Horizon,
        timestamp: DateTime<Utc>,
    },

    #[error(
        "insufficient realized history for {pair}/{horizon}: last decision at {timestamp} needs prices through {required_until}"
    )]
    InsufficientHistory {
        pair: CurrencyPair,
        horizon: Horizon,
        timestamp: DateTime<Utc>,
        required_until: DateTime<Utc>,
    },

    /// A collaborator (bar source, calendar, sentiment source, decision log)
    /// failed underneath the engine.
    #[error("collaborator failure: {0}")]
    Source(#[from] anyhow::Error),
}
