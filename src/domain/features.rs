use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pair::CurrencyPair;

/// Sentinel for "no high-importance event within the bounded horizon".
pub const NO_UPCOMING_EVENT: i64 = -1;

/// Fixed-width numeric snapshot of a pair at one point in time, consumed by
/// exactly one predictor call.
///
/// Window-derived fields are `None` when the bar history is too short for
/// their lookback; a vector with any `None` field is incomplete and routes
/// the forecast to the baseline predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub timestamp: DateTime<Utc>,
    pub pair: CurrencyPair,
    /// 1/5/15-minute simple returns of the close.
    pub ret_1: Option<f64>,
    pub ret_5: Option<f64>,
    pub ret_15: Option<f64>,
    /// Sample standard deviation of 1-minute returns over the trailing window.
    pub vol_5: Option<f64>,
    pub vol_15: Option<f64>,
    pub sma_5: Option<f64>,
    pub sma_15: Option<f64>,
    /// Close minus the 15-bar moving average.
    pub momentum_15: Option<f64>,
    /// Mean 1-minute return over the trailing 20 bars. Not a model input;
    /// used to scale a trained model's expected move.
    pub drift_1m: Option<f64>,
    /// Minutes to the next high-importance event for either leg of the pair,
    /// or [`NO_UPCOMING_EVENT`] if none within the bounded lookahead.
    pub minutes_to_event: i64,
    /// Set iff the next high-importance event is at most 90 minutes away.
    pub is_high_importance: bool,
}

impl FeatureVector {
    /// True when every window-derived feature could be computed.
    pub fn complete(&self) -> bool {
        self.ret_1.is_some()
            && self.ret_5.is_some()
            && self.ret_15.is_some()
            && self.vol_5.is_some()
            && self.vol_15.is_some()
            && self.sma_5.is_some()
            && self.sma_15.is_some()
            && self.momentum_15.is_some()
    }

    /// Model input row in the canonical column order. `None` for an
    /// incomplete vector; incomplete vectors never reach a trained model.
    pub fn to_model_input(&self) -> Option<Vec<f64>> {
        Some(vec![
            self.ret_1?,
            self.ret_5?,
            self.ret_15?,
            self.vol_5?,
            self.vol_15?,
            self.sma_5?,
            self.sma_15?,
            self.momentum_15?,
            self.minutes_to_event as f64,
            if self.is_high_importance { 1.0 } else { 0.0 },
        ])
    }

    /// Canonical model input column names, matching [`Self::to_model_input`].
    pub fn feature_names() -> [&'static str; 10] {
        [
            "ret_1m",
            "ret_5m",
            "ret_15m",
            "vol_5m",
            "vol_15m",
            "sma_5",
            "sma_15",
            "momentum_15m",
            "minutes_to_event",
            "is_high_importance",
        ]
    }
}
