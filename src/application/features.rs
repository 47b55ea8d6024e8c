//! Feature builder: turns a bar window and the economic calendar into one
//! fixed-width [`FeatureVector`] for the latest bar time.

use chrono::{DateTime, Duration, Utc};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::domain::errors::ForecastError;
use crate::domain::features::{FeatureVector, NO_UPCOMING_EVENT};
use crate::domain::horizon::Horizon;
use crate::domain::market::{Bar, EconomicEvent, Importance};
use crate::domain::pair::CurrencyPair;

/// Trailing bars used for the drift estimate behind expected-move scaling.
const DRIFT_WINDOW: usize = 20;

#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    /// How far ahead to look for the next high-importance event.
    pub event_lookahead: Duration,
    /// Proximity window that marks a vector as event-sensitive.
    pub high_importance_window_minutes: i64,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self {
            event_lookahead: Duration::hours(24),
            high_importance_window_minutes: 90,
        }
    }
}

impl FeatureBuilder {
    /// Build the feature vector for the final bar of `bars`.
    ///
    /// `bars` must be in strictly increasing timestamp order (one-minute
    /// cadence assumed for the return/volatility lookbacks, not enforced).
    /// Features whose lookback exceeds the available history are left unset,
    /// marking the vector incomplete. An empty bar window is the only hard
    /// failure; `at` is the request time used for its error context.
    pub fn build(
        &self,
        bars: &[Bar],
        events: &[EconomicEvent],
        pair: &CurrencyPair,
        horizon: Horizon,
        at: DateTime<Utc>,
    ) -> Result<FeatureVector, ForecastError> {
        let Some(last) = bars.last() else {
            return Err(ForecastError::InsufficientData {
                pair: pair.clone(),
                horizon,
                timestamp: at,
                detail: "empty bar window".to_string(),
            });
        };

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let n = closes.len();

        // 1-minute simple returns between consecutive bars.
        let returns: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();

        let ret = |k: usize| -> Option<f64> {
            if n > k {
                let prev = closes[n - 1 - k];
                Some((closes[n - 1] - prev) / prev)
            } else {
                None
            }
        };

        let vol = |k: usize| -> Option<f64> {
            if returns.len() >= k {
                Some(returns[returns.len() - k..].iter().std_dev())
            } else {
                None
            }
        };

        let sma = |k: usize| -> Option<f64> {
            if n >= k {
                Some(closes[n - k..].iter().mean())
            } else {
                None
            }
        };

        let sma_15 = sma(15);
        let momentum_15 = sma_15.map(|s| closes[n - 1] - s);
        let drift_1m = if returns.is_empty() {
            None
        } else {
            let tail = returns.len().saturating_sub(DRIFT_WINDOW);
            Some(returns[tail..].iter().mean())
        };

        let minutes_to_event = self.next_high_importance_minutes(events, last.timestamp);
        let is_high_importance = minutes_to_event >= 0
            && minutes_to_event <= self.high_importance_window_minutes;

        let vector = FeatureVector {
            timestamp: last.timestamp,
            pair: pair.clone(),
            ret_1: ret(1),
            ret_5: ret(5),
            ret_15: ret(15),
            vol_5: vol(5),
            vol_15: vol(15),
            sma_5: sma(5),
            sma_15,
            momentum_15,
            drift_1m,
            minutes_to_event,
            is_high_importance,
        };

        debug!(
            pair = %pair,
            bars = n,
            complete = vector.complete(),
            minutes_to_event,
            "features built"
        );

        Ok(vector)
    }

    /// Minutes from `now` to the next high-importance event within the
    /// lookahead, or [`NO_UPCOMING_EVENT`] when there is none.
    fn next_high_importance_minutes(&self, events: &[EconomicEvent], now: DateTime<Utc>) -> i64 {
        events
            .iter()
            .filter(|e| e.importance >= Importance::High)
            .filter(|e| e.timestamp >= now && e.timestamp <= now + self.event_lookahead)
            .map(|e| (e.timestamp - now).num_minutes())
            .min()
            .unwrap_or(NO_UPCOMING_EVENT)
    }
}
