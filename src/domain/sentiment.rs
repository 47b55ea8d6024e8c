use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Urgency attached to a scored news item by the upstream analysis step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl FromStr for Urgency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            "critical" => Ok(Urgency::Critical),
            _ => Err(anyhow!(
                "Invalid urgency: '{}'. Valid options: low, medium, high, critical",
                s
            )),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Low => write!(f, "low"),
            Urgency::Medium => write!(f, "medium"),
            Urgency::High => write!(f, "high"),
            Urgency::Critical => write!(f, "critical"),
        }
    }
}

/// One article's sentiment record as produced by the upstream scoring step
/// (an external collaborator; this crate never scores text itself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSentiment {
    pub timestamp: DateTime<Utc>,
    /// Currencies the article was tagged with, e.g. `["USD", "INR"]`.
    pub currencies: Vec<String>,
    /// Overall article sentiment in [-1, 1].
    pub sentiment_overall: f64,
    /// Per-currency sentiment in [-1, 1], keyed by upper-case currency code.
    /// Missing currencies fall back to the overall score for the base leg.
    #[serde(default)]
    pub sentiment_by_currency: HashMap<String, f64>,
    /// Scoring confidence in [0, 1].
    pub confidence: f64,
    /// Estimated market impact in [0, 10].
    pub impact_score: f64,
    pub urgency: Urgency,
    /// Short upstream explanation of the score, used in summaries.
    #[serde(default)]
    pub explanation: String,
}

impl ArticleSentiment {
    pub fn sentiment_for(&self, currency: &str) -> Option<f64> {
        self.sentiment_by_currency
            .get(&currency.to_uppercase())
            .copied()
    }

    pub fn mentions(&self, currency: &str) -> bool {
        self.currencies
            .iter()
            .any(|c| c.eq_ignore_ascii_case(currency))
    }
}

/// Aggregated news stance for a pair over a lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSentiment {
    /// Net base-vs-quote sentiment in [-1, 1]; positive favors the base.
    pub sentiment_score: f64,
    /// Aggregate confidence in [0, 1], discounted toward 0 for thin windows.
    pub confidence: f64,
    /// Max impact among contributing articles; one big story dominates.
    pub impact_score: f64,
    /// Max urgency among contributing articles.
    pub urgency: Urgency,
    pub summary: String,
}

/// Aggregation outcome: either real news flow or explicitly none.
///
/// `Absent` is a valid state, not an error, and is never representable as a
/// zero-score sentiment with non-zero confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SentimentSignal {
    Absent,
    Present(NewsSentiment),
}

impl SentimentSignal {
    pub fn is_absent(&self) -> bool {
        matches!(self, SentimentSignal::Absent)
    }

    pub fn as_present(&self) -> Option<&NewsSentiment> {
        match self {
            SentimentSignal::Absent => None,
            SentimentSignal::Present(s) => Some(s),
        }
    }
}
