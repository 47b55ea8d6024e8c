//! Advisor: orchestrates one forecast request end to end, from bar history
//! through fusion and policy to the appended decision record.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::application::backtest::BacktestEvaluator;
use crate::application::features::FeatureBuilder;
use crate::application::fusion::{FusionConfig, FusionEngine};
use crate::application::policy::{DecisionPolicy, PolicyConfig};
use crate::application::predictor::{BASELINE_MODEL_ID, BaselinePredictor, ModelStore, Predictor, resolve_predictor};
use crate::application::sentiment::SentimentAggregator;
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{
    BacktestMetric, Decision, Direction, PolicyKind, Recommendation,
};
use crate::domain::horizon::Horizon;
use crate::domain::pair::CurrencyPair;
use crate::domain::ports::{BarSource, CalendarSource, DecisionLog, SentimentSource};
use crate::domain::sentiment::SentimentSignal;

/// Advisor defaults; per-request overrides win over these.
#[derive(Debug, Clone)]
pub struct AdvisorSettings {
    pub policy: PolicyConfig,
    pub fusion: FusionConfig,
    /// Model consulted when a request names none.
    pub default_model_id: Option<String>,
    /// Master switch for news fusion; a request can only narrow it.
    pub enable_fusion: bool,
    pub sentiment_lookback: Duration,
    pub bar_lookback: Duration,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            fusion: FusionConfig::default(),
            default_model_id: None,
            enable_fusion: true,
            sentiment_lookback: Duration::minutes(60),
            bar_lookback: Duration::minutes(360),
        }
    }
}

/// One forecast request. Unset fields fall back to [`AdvisorSettings`].
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub pair: CurrencyPair,
    pub horizon: Horizon,
    pub policy: Option<PolicyKind>,
    pub spread_bps: Option<f64>,
    pub prob_threshold: Option<f64>,
    pub embargo_minutes: Option<i64>,
    pub model_id: Option<String>,
    pub use_hybrid: bool,
}

impl ForecastRequest {
    pub fn new(pair: CurrencyPair, horizon: Horizon) -> Self {
        Self {
            pair,
            horizon,
            policy: None,
            spread_bps: None,
            prob_threshold: None,
            embargo_minutes: None,
            model_id: None,
            use_hybrid: true,
        }
    }
}

/// Fusion detail attached to a response when news actually contributed.
#[derive(Debug, Clone, Serialize)]
pub struct HybridBlock {
    pub probability_up_ml: f64,
    pub probability_up_hybrid: f64,
    pub fusion_weight_ml: f64,
    pub fusion_weight_llm: f64,
    pub news_sentiment: f64,
    pub news_confidence: f64,
    pub news_impact: f64,
    pub news_summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastResponse {
    pub pair: CurrencyPair,
    pub horizon: Horizon,
    /// Posterior up-probability (equals the ML prior when fusion did not run).
    pub probability_up: f64,
    pub expected_delta_bps: f64,
    pub recommendation: Recommendation,
    pub direction: Direction,
    pub action_hint: String,
    pub model_id: String,
    pub explanation: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<HybridBlock>,
}

pub struct Advisor {
    bars: Arc<dyn BarSource>,
    calendar: Arc<dyn CalendarSource>,
    news: Arc<dyn SentimentSource>,
    decisions: Arc<dyn DecisionLog>,
    models: Arc<dyn ModelStore>,
    feature_builder: FeatureBuilder,
    aggregator: SentimentAggregator,
    settings: AdvisorSettings,
}

impl Advisor {
    pub fn new(
        bars: Arc<dyn BarSource>,
        calendar: Arc<dyn CalendarSource>,
        news: Arc<dyn SentimentSource>,
        decisions: Arc<dyn DecisionLog>,
        models: Arc<dyn ModelStore>,
        settings: AdvisorSettings,
    ) -> Self {
        Self {
            bars,
            calendar,
            news,
            decisions,
            models,
            feature_builder: FeatureBuilder::default(),
            aggregator: SentimentAggregator::default(),
            settings,
        }
    }

    /// Run one forecast at `now` and append the resulting decision.
    ///
    /// The flow is deterministic for fixed inputs: bar window, calendar,
    /// article set, and model all resolve from `now` and the request alone.
    pub fn forecast(
        &self,
        request: &ForecastRequest,
        now: DateTime<Utc>,
    ) -> Result<ForecastResponse, ForecastError> {
        let pair = &request.pair;
        let horizon = request.horizon;

        let bars = self
            .bars
            .bars(pair, now - self.settings.bar_lookback, now)?;
        let events = self
            .calendar
            .events(pair, now, now + self.feature_builder.event_lookahead)?;
        let features = self
            .feature_builder
            .build(&bars, &events, pair, horizon, now)?;

        // A trained model only ever sees complete vectors; thin history goes
        // straight to the baseline so the PARTIAL verdict names it honestly.
        let predictor: Box<dyn Predictor> = if features.complete() {
            resolve_predictor(
                self.models.as_ref(),
                request.model_id.as_deref(),
                self.settings.default_model_id.as_deref(),
                pair,
                horizon,
            )
        } else {
            warn!(pair = %pair, "incomplete features, using baseline predictor");
            Box::new(BaselinePredictor)
        };
        let ml = predictor.predict(&features);

        let signal = if request.use_hybrid && self.settings.enable_fusion {
            let articles = self.news.articles(
                pair,
                now - self.settings.sentiment_lookback,
                now,
            )?;
            self.aggregator
                .aggregate(&articles, pair, now, self.settings.sentiment_lookback)
        } else {
            SentimentSignal::Absent
        };

        let fusion = FusionEngine::new(self.settings.fusion.clone());
        let fused = fusion.fuse(&ml, &signal);

        let policy_config = PolicyConfig {
            policy: request.policy.unwrap_or(self.settings.policy.policy),
            spread_bps: request.spread_bps.unwrap_or(self.settings.policy.spread_bps),
            prob_threshold: request
                .prob_threshold
                .unwrap_or(self.settings.policy.prob_threshold),
            embargo_minutes: request
                .embargo_minutes
                .unwrap_or(self.settings.policy.embargo_minutes),
        };
        let policy = DecisionPolicy::new(policy_config.clone());
        let verdict = policy.evaluate(pair, &fused, &features, ml.confidence);

        let mut explanation: Vec<String> = Vec::new();
        if ml.model_id == BASELINE_MODEL_ID {
            explanation.push("baseline: neutral prior".to_string());
        } else {
            explanation.push(format!("model={}", ml.model_id));
        }
        explanation.push(format!(
            "policy={} spread_bps={} prob_threshold={}",
            policy_config.policy, policy_config.spread_bps, policy_config.prob_threshold
        ));
        if fused.fusion_weight_llm > 0.05 {
            explanation.push(format!(
                "hybrid: ML={:.0}% news={:.0}%",
                fused.fusion_weight_ml * 100.0,
                fused.fusion_weight_llm * 100.0
            ));
            if let Some(news) = signal.as_present() {
                explanation.push(news.summary.clone());
            }
        }
        explanation.extend(verdict.notes.iter().cloned());
        explanation.push(format!("dir={}", verdict.direction));
        explanation.push(verdict.action_hint.clone());

        let decision = Decision {
            timestamp: now,
            pair: pair.clone(),
            horizon,
            prior_probability: fused.probability_up_ml,
            posterior_probability: fused.probability_up_hybrid,
            expected_delta_bps: fused.expected_delta_hybrid,
            recommendation: verdict.recommendation,
            direction: verdict.direction,
            embargo_applied: verdict.embargo_applied,
            explanation: explanation.join("; "),
            policy_id: policy_config.policy,
            model_id: ml.model_id.clone(),
        };
        self.decisions.append(&decision)?;

        info!(
            pair = %pair,
            horizon = %horizon,
            recommendation = %verdict.recommendation,
            direction = %verdict.direction,
            probability = fused.probability_up_hybrid,
            model_id = %ml.model_id,
            "forecast complete"
        );

        let hybrid = signal.as_present().map(|news| HybridBlock {
            probability_up_ml: fused.probability_up_ml,
            probability_up_hybrid: fused.probability_up_hybrid,
            fusion_weight_ml: fused.fusion_weight_ml,
            fusion_weight_llm: fused.fusion_weight_llm,
            news_sentiment: news.sentiment_score,
            news_confidence: news.confidence,
            news_impact: news.impact_score,
            news_summary: news.summary.clone(),
        });

        Ok(ForecastResponse {
            pair: pair.clone(),
            horizon,
            probability_up: fused.probability_up_hybrid,
            expected_delta_bps: fused.expected_delta_hybrid,
            recommendation: verdict.recommendation,
            direction: verdict.direction,
            action_hint: verdict.action_hint,
            model_id: ml.model_id,
            explanation,
            hybrid,
        })
    }

    /// Replay the logged decisions for a key over the trailing window and
    /// score them against realized prices.
    pub fn backtest(
        &self,
        pair: &CurrencyPair,
        horizon: Horizon,
        lookback_hours: i64,
        spread_bps: f64,
        now: DateTime<Utc>,
    ) -> Result<BacktestMetric, ForecastError> {
        let since = now - Duration::hours(lookback_hours);
        let decisions: Vec<Decision> = self
            .decisions
            .replay(pair, horizon)?
            .into_iter()
            .filter(|d| d.timestamp >= since)
            .collect();

        let bar_from = decisions.first().map(|d| d.timestamp).unwrap_or(since);
        let bars = self.bars.bars(pair, bar_from, now)?;

        BacktestEvaluator::new(spread_bps).run(pair, horizon, &decisions, &bars, lookback_hours)
    }
}
