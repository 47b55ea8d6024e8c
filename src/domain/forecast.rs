use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::horizon::Horizon;
use super::pair::CurrencyPair;

/// Raw model output for one feature vector. Stateless value object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlPrediction {
    /// Probability the pair closes up over the horizon, in [0, 1].
    pub probability_up: f64,
    /// Signed expected move in basis points.
    pub expected_delta_bps: f64,
    /// Model confidence in [0, 1]; exactly 0 for the baseline.
    pub confidence: f64,
    pub model_id: String,
}

/// Fusion output: the ML prior next to the news-adjusted posterior.
///
/// Invariant: `fusion_weight_ml + fusion_weight_llm == 1` exactly, and when
/// no usable sentiment exists the hybrid fields equal the ML fields bit for
/// bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridForecast {
    pub probability_up_ml: f64,
    pub probability_up_hybrid: f64,
    pub expected_delta_ml: f64,
    pub expected_delta_hybrid: f64,
    pub fusion_weight_ml: f64,
    pub fusion_weight_llm: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    /// Act now: the signal clears the configured threshold.
    #[serde(rename = "NOW")]
    Now,
    /// Hold off: the signal is below threshold or embargoed.
    #[serde(rename = "WAIT")]
    Wait,
    /// Insufficient basis (incomplete features or a zero-confidence
    /// fallback). Distinct from `Wait`: there is no confident verdict at all.
    #[serde(rename = "PARTIAL")]
    Partial,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Now => write!(f, "NOW"),
            Recommendation::Wait => write!(f, "WAIT"),
            Recommendation::Partial => write!(f, "PARTIAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
}

impl Direction {
    /// +1 for up, -1 for down; the sign applied to realized moves.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// Which deterministic rule converts a forecast into a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Act iff the expected absolute move clears the spread cost.
    Expected,
    /// Act iff the posterior probability is decisive in either direction.
    Prob,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Expected => "expected",
            PolicyKind::Prob => "prob",
        }
    }
}

impl FromStr for PolicyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "expected" => Ok(PolicyKind::Expected),
            "prob" => Ok(PolicyKind::Prob),
            _ => Err(anyhow!(
                "Invalid policy: '{}'. Valid options: expected, prob",
                s
            )),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only record of one advisory verdict. Never mutated after creation;
/// replayed read-only by the backtest evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub timestamp: DateTime<Utc>,
    pub pair: CurrencyPair,
    pub horizon: Horizon,
    /// ML-only probability before fusion.
    pub prior_probability: f64,
    /// Probability after news fusion (equal to the prior when none ran).
    pub posterior_probability: f64,
    pub expected_delta_bps: f64,
    pub recommendation: Recommendation,
    pub direction: Direction,
    pub embargo_applied: bool,
    pub explanation: String,
    pub policy_id: PolicyKind,
    pub model_id: String,
}

/// Aggregate realized performance of a decision log slice. Recomputed per
/// run, never updated incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetric {
    pub pair: CurrencyPair,
    pub horizon: Horizon,
    pub lookback_hours: i64,
    pub trade_count: usize,
    /// Fraction of included trades with positive net PnL.
    pub win_rate: f64,
    pub avg_pnl_bps: f64,
    pub median_pnl_bps: f64,
}
