//! Backtest evaluator: replays logged decisions against realized prices to
//! measure what the gating policy would have earned.

use statrs::statistics::{Data, Median, Statistics};
use tracing::info;

use crate::domain::errors::ForecastError;
use crate::domain::forecast::{BacktestMetric, Decision, Recommendation};
use crate::domain::horizon::Horizon;
use crate::domain::market::Bar;
use crate::domain::pair::CurrencyPair;

#[derive(Debug, Clone)]
pub struct BacktestEvaluator {
    /// Round-trip cost subtracted from every realized move.
    pub spread_bps: f64,
}

impl BacktestEvaluator {
    pub fn new(spread_bps: f64) -> Self {
        Self { spread_bps }
    }

    /// Replay `decisions` (chronological, all for `pair`/`horizon`) against
    /// the realized close series.
    ///
    /// Only NOW decisions enter the trade set: the policy under test is a
    /// gating function, so WAIT and PARTIAL are excluded outright rather
    /// than counted as flat zero-PnL trades. Net PnL per trade is
    /// `direction_sign * realized_bps - spread_bps`. Pure over its inputs;
    /// replaying the same log twice yields identical metrics.
    pub fn run(
        &self,
        pair: &CurrencyPair,
        horizon: Horizon,
        decisions: &[Decision],
        bars: &[Bar],
        lookback_hours: i64,
    ) -> Result<BacktestMetric, ForecastError> {
        if let Some(last) = decisions.last() {
            let required_until = last.timestamp + horizon.to_duration();
            let covered = bars
                .last()
                .is_some_and(|bar| bar.timestamp >= required_until);
            if !covered {
                return Err(ForecastError::InsufficientHistory {
                    pair: pair.clone(),
                    horizon,
                    timestamp: last.timestamp,
                    required_until,
                });
            }
        }

        let mut pnls: Vec<f64> = Vec::new();
        let mut wins = 0usize;

        for decision in decisions {
            if decision.recommendation != Recommendation::Now {
                continue;
            }
            let Some(entry) = price_at(bars, decision.timestamp) else {
                continue;
            };
            let Some(exit) = price_at(bars, decision.timestamp + horizon.to_duration()) else {
                continue;
            };

            let realized_bps = (exit - entry) / entry * 10_000.0;
            let pnl_bps = decision.direction.sign() * realized_bps - self.spread_bps;
            if pnl_bps > 0.0 {
                wins += 1;
            }
            pnls.push(pnl_bps);
        }

        let trade_count = pnls.len();
        let (win_rate, avg_pnl_bps, median_pnl_bps) = if trade_count == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (
                wins as f64 / trade_count as f64,
                pnls.iter().mean(),
                Data::new(pnls.clone()).median(),
            )
        };

        info!(
            pair = %pair,
            horizon = %horizon,
            trades = trade_count,
            win_rate,
            avg_pnl_bps,
            "backtest complete"
        );

        Ok(BacktestMetric {
            pair: pair.clone(),
            horizon,
            lookback_hours,
            trade_count,
            win_rate,
            avg_pnl_bps,
            median_pnl_bps,
        })
    }
}

/// Close of the first bar at or after `at`, the realized price for that
/// instant.
fn price_at(bars: &[Bar], at: chrono::DateTime<chrono::Utc>) -> Option<f64> {
    bars.iter().find(|b| b.timestamp >= at).map(|b| b.close)
}
