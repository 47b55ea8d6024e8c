//! Decision policy engine: deterministic rules turning a fused forecast into
//! an actionable recommendation, with an event-proximity embargo.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::features::FeatureVector;
use crate::domain::forecast::{Direction, HybridForecast, PolicyKind, Recommendation};
use crate::domain::pair::CurrencyPair;

/// Policy knobs. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub policy: PolicyKind,
    /// Expected-move gate: act only if `|expected_delta| > spread_bps`.
    pub spread_bps: f64,
    /// Probability gate: act only if the posterior is at least this decisive
    /// in either direction.
    pub prob_threshold: f64,
    /// Force WAIT within this many minutes of a high-importance event.
    /// 0 disables the embargo.
    pub embargo_minutes: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Expected,
            spread_bps: 2.0,
            prob_threshold: 0.6,
            embargo_minutes: 0,
        }
    }
}

/// Outcome of one policy evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyVerdict {
    pub recommendation: Recommendation,
    pub direction: Direction,
    pub embargo_applied: bool,
    pub action_hint: String,
    /// Policy-side explanation fragments, in order.
    pub notes: Vec<String>,
}

/// State-free evaluator over `(forecast, config)`.
#[derive(Debug, Clone, Default)]
pub struct DecisionPolicy {
    config: PolicyConfig,
}

impl DecisionPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Evaluate the configured policy, then the embargo override.
    ///
    /// `predictor_confidence` of exactly 0 (the baseline fallback) or an
    /// incomplete feature vector yields `PARTIAL`: there is no confident
    /// basis for a verdict, which is not the same as advising to wait.
    /// The embargo can only strengthen a NOW into a WAIT, never the reverse.
    pub fn evaluate(
        &self,
        pair: &CurrencyPair,
        forecast: &HybridForecast,
        features: &FeatureVector,
        predictor_confidence: f64,
    ) -> PolicyVerdict {
        let posterior = forecast.probability_up_hybrid;
        let direction = if posterior >= 0.5 {
            Direction::Up
        } else {
            Direction::Down
        };
        let action_hint = Self::action_hint(pair, direction);
        let mut notes = Vec::new();

        if !features.complete() || predictor_confidence == 0.0 {
            let reason = if features.complete() {
                "zero-confidence baseline prediction"
            } else {
                "incomplete feature vector"
            };
            notes.push(format!("insufficient basis: {reason}"));
            return PolicyVerdict {
                recommendation: Recommendation::Partial,
                direction,
                embargo_applied: false,
                action_hint,
                notes,
            };
        }

        let mut recommendation = match self.config.policy {
            PolicyKind::Expected => {
                if forecast.expected_delta_hybrid.abs() > self.config.spread_bps {
                    Recommendation::Now
                } else {
                    Recommendation::Wait
                }
            }
            PolicyKind::Prob => {
                if posterior >= self.config.prob_threshold
                    || posterior <= 1.0 - self.config.prob_threshold
                {
                    Recommendation::Now
                } else {
                    Recommendation::Wait
                }
            }
        };

        let mut embargo_applied = false;
        let minutes_to_event = features.minutes_to_event;
        if self.config.embargo_minutes > 0
            && minutes_to_event >= 0
            && minutes_to_event <= self.config.embargo_minutes
        {
            recommendation = Recommendation::Wait;
            embargo_applied = true;
            notes.push(format!(
                "embargo: minutes_to_event={minutes_to_event} <= {}",
                self.config.embargo_minutes
            ));
        }

        debug!(
            pair = %pair,
            policy = %self.config.policy,
            %recommendation,
            %direction,
            embargo_applied,
            "policy evaluated"
        );

        PolicyVerdict {
            recommendation,
            direction,
            embargo_applied,
            action_hint,
            notes,
        }
    }

    fn action_hint(pair: &CurrencyPair, direction: Direction) -> String {
        let base = pair.base();
        let quote = pair.quote();
        match direction {
            Direction::Up => format!(
                "{base} likely to strengthen vs {quote}. If you need to BUY {base}, \
                 consider acting sooner; if you plan to SELL {base}, delaying may help."
            ),
            Direction::Down => format!(
                "{base} likely to weaken vs {quote}. If you need to SELL {base}, \
                 consider acting sooner; if you plan to BUY {base}, waiting may help."
            ),
        }
    }
}
