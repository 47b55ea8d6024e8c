//! End-to-end forecast flow: bars and news through the advisor to a logged
//! decision, then that log replayed by the backtest.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use fxadvisor::application::advisor::{Advisor, AdvisorSettings, ForecastRequest};
use fxadvisor::application::predictor::ScoreModel;
use fxadvisor::domain::forecast::{Direction, Recommendation};
use fxadvisor::domain::horizon::Horizon;
use fxadvisor::domain::market::{Bar, EconomicEvent, Importance};
use fxadvisor::domain::pair::CurrencyPair;
use fxadvisor::domain::ports::{BarSource, CalendarSource, DecisionLog, SentimentSource};
use fxadvisor::domain::sentiment::{ArticleSentiment, Urgency};
use fxadvisor::infrastructure::csv_store::MemoryDecisionLog;
use fxadvisor::infrastructure::model_store::{FileModelStore, ModelRecord};

fn pair() -> CurrencyPair {
    CurrencyPair::from_str("USDINR").unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

struct FixedBars(Vec<Bar>);

impl BarSource for FixedBars {
    fn bars(
        &self,
        _pair: &CurrencyPair,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        Ok(self
            .0
            .iter()
            .filter(|b| b.timestamp >= from && b.timestamp <= to)
            .cloned()
            .collect())
    }
}

struct FixedEvents(Vec<EconomicEvent>);

impl CalendarSource for FixedEvents {
    fn events(
        &self,
        _pair: &CurrencyPair,
        _from: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> Result<Vec<EconomicEvent>> {
        Ok(self.0.clone())
    }
}

struct FixedArticles(Vec<ArticleSentiment>);

impl SentimentSource for FixedArticles {
    fn articles(
        &self,
        _pair: &CurrencyPair,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<ArticleSentiment>> {
        Ok(self.0.clone())
    }
}

/// Rising one-minute series ending `minutes_past_now` after `now()`.
fn rising_bars(total: i64, minutes_past_now: i64) -> Vec<Bar> {
    (0..total)
        .map(|i| {
            let close = 100.0 + 0.08 * i as f64;
            Bar {
                timestamp: now() - Duration::minutes(total - 1 - i - minutes_past_now),
                pair: pair(),
                open: close,
                high: close,
                low: close,
                close,
            }
        })
        .collect()
}

fn bullish_article() -> ArticleSentiment {
    ArticleSentiment {
        timestamp: now() - Duration::minutes(10),
        currencies: vec!["USD".into()],
        sentiment_overall: 0.75,
        sentiment_by_currency: HashMap::from([("USD".to_string(), 0.75)]),
        confidence: 0.85,
        impact_score: 8.5,
        urgency: Urgency::High,
        explanation: "hawkish central bank commentary".to_string(),
    }
}

/// Constant-label training data: every tree leaf averages to 0.7, so the
/// model's up-probability is a steady 0.7 regardless of input.
fn fitted_model() -> ScoreModel {
    let rows: Vec<Vec<f64>> = (0..40)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            vec![
                sign * 0.0002,
                sign * 0.0008,
                sign * 0.002,
                0.0001,
                0.0002,
                100.0,
                100.0,
                sign * 0.1,
                -1.0,
                0.0,
            ]
        })
        .collect();
    let labels = vec![0.7; 40];
    let x = DenseMatrix::from_2d_vec(&rows).unwrap();
    RandomForestRegressor::fit(&x, &labels, RandomForestRegressorParameters::default()).unwrap()
}

fn model_store(tag: &str) -> (Arc<FileModelStore>, PathBuf) {
    let dir = std::env::temp_dir().join(format!(
        "fxadvisor_flow_{}_{}_{tag}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or(0)
    ));
    let store = FileModelStore::new(&dir);
    store
        .save(
            &fitted_model(),
            ModelRecord {
                model_id: "rf_usdinr_1h".to_string(),
                pair: pair(),
                horizon: Horizon::OneHour,
                created_at: now() - Duration::hours(6),
            },
        )
        .unwrap();
    (Arc::new(store), dir)
}

fn advisor(
    bars: Vec<Bar>,
    events: Vec<EconomicEvent>,
    articles: Vec<ArticleSentiment>,
    models: Arc<FileModelStore>,
) -> (Advisor, Arc<MemoryDecisionLog>) {
    let log = Arc::new(MemoryDecisionLog::new());
    let advisor = Advisor::new(
        Arc::new(FixedBars(bars)),
        Arc::new(FixedEvents(events)),
        Arc::new(FixedArticles(articles)),
        log.clone(),
        models,
        AdvisorSettings::default(),
    );
    (advisor, log)
}

#[test]
fn test_forecast_appends_matching_decision() {
    let (models, dir) = model_store("append");
    let (advisor, log) = advisor(rising_bars(120, 0), vec![], vec![], models);

    let response = advisor
        .forecast(&ForecastRequest::new(pair(), Horizon::OneHour), now())
        .unwrap();

    assert_eq!(response.model_id, "rf_usdinr_1h");
    assert!((response.probability_up - 0.7).abs() < 1e-9);
    assert_eq!(response.direction, Direction::Up);
    // Steady climb clears the 2 bps spread under the expected policy.
    assert_eq!(response.recommendation, Recommendation::Now);
    assert!(response.hybrid.is_none());

    let logged = log.replay(&pair(), Horizon::OneHour).unwrap();
    assert_eq!(logged.len(), 1);
    let decision = &logged[0];
    assert_eq!(decision.timestamp, now());
    assert_eq!(decision.posterior_probability, response.probability_up);
    assert_eq!(decision.expected_delta_bps, response.expected_delta_bps);
    assert_eq!(decision.recommendation, response.recommendation);
    assert_eq!(decision.model_id, response.model_id);
    assert!(decision.explanation.contains("model=rf_usdinr_1h"));
    assert!(decision.explanation.contains("dir=UP"));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_bullish_news_shifts_posterior_up() {
    let (models, dir) = model_store("news");
    let (advisor, _log) = advisor(rising_bars(120, 0), vec![], vec![bullish_article()], models);

    let response = advisor
        .forecast(&ForecastRequest::new(pair(), Horizon::OneHour), now())
        .unwrap();

    let hybrid = response.hybrid.expect("high-impact news should fuse");
    assert!((hybrid.probability_up_ml - 0.7).abs() < 1e-9);
    assert!(hybrid.probability_up_hybrid > hybrid.probability_up_ml);
    assert!((hybrid.fusion_weight_ml + hybrid.fusion_weight_llm - 1.0).abs() < 1e-12);
    assert!(hybrid.fusion_weight_llm > 0.0);
    assert!(hybrid.news_summary.contains("USD bullish vs INR"));
    // Bullish amplification grows the expected up-move.
    assert!(response.expected_delta_bps > 0.0);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_embargo_forces_wait_end_to_end() {
    let (models, dir) = model_store("embargo");
    let events = vec![EconomicEvent {
        timestamp: now() + Duration::minutes(30),
        currency: "USD".to_string(),
        importance: Importance::High,
    }];
    let (advisor, log) = advisor(rising_bars(120, 0), events, vec![], models);

    let mut request = ForecastRequest::new(pair(), Horizon::OneHour);
    request.embargo_minutes = Some(60);
    let response = advisor.forecast(&request, now()).unwrap();

    assert_eq!(response.recommendation, Recommendation::Wait);
    assert!(response.explanation.iter().any(|p| p.contains("embargo")));

    let logged = log.replay(&pair(), Horizon::OneHour).unwrap();
    assert!(logged[0].embargo_applied);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_backtest_replays_logged_decisions() {
    let (models, dir) = model_store("backtest");
    // Series keeps rising for 70 minutes past the decision, covering the
    // one-hour horizon.
    let (advisor, _log) = advisor(rising_bars(190, 70), vec![], vec![], models);

    advisor
        .forecast(&ForecastRequest::new(pair(), Horizon::OneHour), now())
        .unwrap();

    let eval_at = now() + Duration::minutes(70);
    let metric = advisor
        .backtest(&pair(), Horizon::OneHour, 24, 2.0, eval_at)
        .unwrap();

    assert_eq!(metric.trade_count, 1);
    // Long a rising market: realized move dwarfs the 2 bps spread.
    assert!(metric.avg_pnl_bps > 0.0);
    assert_eq!(metric.win_rate, 1.0);
    assert_eq!(metric.median_pnl_bps, metric.avg_pnl_bps);

    // Replaying the same log is idempotent.
    let again = advisor
        .backtest(&pair(), Horizon::OneHour, 24, 2.0, eval_at)
        .unwrap();
    assert_eq!(again, metric);

    fs::remove_dir_all(dir).ok();
}
