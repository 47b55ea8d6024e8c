//! Bayesian-style fusion of a technical ML prior with aggregated news
//! sentiment into one posterior forecast.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::forecast::{HybridForecast, MlPrediction};
use crate::domain::sentiment::{NewsSentiment, SentimentSignal, Urgency};

/// Fusion knobs. Immutable once constructed; the engine reads nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Ceiling on the news weight, regardless of confidence or impact.
    pub max_llm_weight: f64,
    /// Sentiment below this confidence is ignored outright.
    pub min_confidence: f64,
    /// Impact at or above which news carries its full confidence-scaled
    /// weight.
    pub high_impact_threshold: f64,
    /// Weight multiplier for news below the impact threshold. Tunable, not
    /// calibrated; 0.4 matches the historical tuning.
    pub low_impact_dampening: f64,
    /// Cap on expected-move amplification (0.5 = up to ±50%).
    pub max_amplification: f64,
    /// Additive weight boosts for urgent news, still clamped to
    /// `max_llm_weight`. Both default to 0 so the base formula holds
    /// exactly; the historical tuning used 0.05 / 0.10.
    pub urgency_boost_high: f64,
    pub urgency_boost_critical: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            max_llm_weight: 0.4,
            min_confidence: 0.3,
            high_impact_threshold: 7.0,
            low_impact_dampening: 0.4,
            max_amplification: 0.5,
            urgency_boost_high: 0.0,
            urgency_boost_critical: 0.0,
        }
    }
}

/// Combines one ML prediction with one sentiment signal. Stateless beyond
/// its configuration; every call is a pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse the ML prior with the news signal.
    ///
    /// Absent or under-confident sentiment collapses to the ML-only forecast
    /// with the hybrid fields copied bit for bit; no floating drift.
    pub fn fuse(&self, ml: &MlPrediction, sentiment: &SentimentSignal) -> HybridForecast {
        let news = match sentiment {
            SentimentSignal::Absent => return self.ml_only(ml, "no recent news"),
            SentimentSignal::Present(news) if news.confidence < self.config.min_confidence => {
                return self.ml_only(ml, "low news confidence");
            }
            SentimentSignal::Present(news) => news,
        };

        let weight_llm = self.llm_weight(news);
        let weight_ml = 1.0 - weight_llm;

        let posterior = Self::bayesian_update(ml.probability_up, news.sentiment_score, weight_llm);

        // High-impact news amplifies (or dampens) the expected move.
        let impact_normalized = (news.impact_score / 10.0).min(1.0);
        let multiplier = 1.0
            + news.sentiment_score * impact_normalized * weight_llm * self.config.max_amplification;
        let expected_delta_hybrid = ml.expected_delta_bps * multiplier;

        let explanation = self.explain(ml, news, posterior, expected_delta_hybrid, weight_llm);

        info!(
            prob_ml = ml.probability_up,
            prob_hybrid = posterior,
            weight_ml,
            weight_llm,
            sentiment = news.sentiment_score,
            "fusion complete"
        );

        HybridForecast {
            probability_up_ml: ml.probability_up,
            probability_up_hybrid: posterior,
            expected_delta_ml: ml.expected_delta_bps,
            expected_delta_hybrid,
            fusion_weight_ml: weight_ml,
            fusion_weight_llm: weight_llm,
            explanation,
        }
    }

    fn ml_only(&self, ml: &MlPrediction, reason: &str) -> HybridForecast {
        HybridForecast {
            probability_up_ml: ml.probability_up,
            probability_up_hybrid: ml.probability_up,
            expected_delta_ml: ml.expected_delta_bps,
            expected_delta_hybrid: ml.expected_delta_bps,
            fusion_weight_ml: 1.0,
            fusion_weight_llm: 0.0,
            explanation: format!("Technical analysis only ({reason})"),
        }
    }

    /// Adaptive news weight in `[0, max_llm_weight]`: confidence-scaled cap,
    /// dampened below the impact threshold, optionally boosted for urgency.
    fn llm_weight(&self, news: &NewsSentiment) -> f64 {
        let base = if news.impact_score >= self.config.high_impact_threshold {
            self.config.max_llm_weight * news.confidence
        } else {
            self.config.max_llm_weight * news.confidence * self.config.low_impact_dampening
        };

        let boost = match news.urgency {
            Urgency::High => self.config.urgency_boost_high,
            Urgency::Critical => self.config.urgency_boost_critical,
            _ => 0.0,
        };

        (base + boost).clamp(0.0, self.config.max_llm_weight)
    }

    /// Asymmetric probability shift with diminishing returns toward either
    /// bound, clamped to [0, 1].
    fn bayesian_update(prior: f64, sentiment: f64, weight_llm: f64) -> f64 {
        let shift = sentiment * weight_llm;
        let posterior = if sentiment > 0.0 {
            prior + shift * (1.0 - prior)
        } else if sentiment < 0.0 {
            prior + shift * prior
        } else {
            prior
        };
        posterior.clamp(0.0, 1.0)
    }

    fn explain(
        &self,
        ml: &MlPrediction,
        news: &NewsSentiment,
        posterior: f64,
        delta_hybrid: f64,
        weight_llm: f64,
    ) -> String {
        let mut parts = Vec::new();

        let ml_stance = if ml.probability_up > 0.5 {
            "bullish"
        } else {
            "bearish"
        };
        parts.push(format!(
            "Technical analysis: {ml_stance} (prob={:.2})",
            ml.probability_up
        ));

        // Only mention news with meaningful influence.
        if weight_llm > 0.05 {
            let news_stance = if news.sentiment_score > 0.0 {
                "bullish"
            } else if news.sentiment_score < 0.0 {
                "bearish"
            } else {
                "neutral"
            };
            parts.push(format!(
                "News sentiment: {news_stance} (score={:+.2}, impact={:.1}/10)",
                news.sentiment_score, news.impact_score
            ));
            if !news.summary.is_empty() {
                parts.push(format!("Context: {}", news.summary));
            }
        }

        let final_stance = if posterior > 0.5 { "bullish" } else { "bearish" };
        parts.push(format!(
            "Combined: {final_stance} (prob={posterior:.2}, expected={delta_hybrid:+.2} bps)"
        ));
        parts.push(format!(
            "Weights: ML={:.0}%, News={:.0}%",
            (1.0 - weight_llm) * 100.0,
            weight_llm * 100.0
        ));

        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ml(prob: f64, delta: f64) -> MlPrediction {
        MlPrediction {
            probability_up: prob,
            expected_delta_bps: delta,
            confidence: 0.65,
            model_id: "rf_test".to_string(),
        }
    }

    fn news(score: f64, confidence: f64, impact: f64) -> SentimentSignal {
        SentimentSignal::Present(NewsSentiment {
            sentiment_score: score,
            confidence,
            impact_score: impact,
            urgency: Urgency::Medium,
            summary: "Recent news: USD bullish vs INR (high-impact)".to_string(),
        })
    }

    #[test]
    fn test_weights_always_sum_to_one_exactly() {
        let engine = FusionEngine::default();
        for &(score, conf, impact) in &[
            (0.75, 0.85, 8.5),
            (-0.4, 0.5, 3.0),
            (0.0, 0.9, 9.9),
            (1.0, 1.0, 10.0),
            (-1.0, 0.31, 0.0),
        ] {
            let fused = engine.fuse(&ml(0.58, 2.3), &news(score, conf, impact));
            assert_eq!(fused.fusion_weight_ml + fused.fusion_weight_llm, 1.0);
        }
        let fused = engine.fuse(&ml(0.58, 2.3), &SentimentSignal::Absent);
        assert_eq!(fused.fusion_weight_ml + fused.fusion_weight_llm, 1.0);
    }

    #[test]
    fn test_absent_sentiment_collapses_exactly() {
        let engine = FusionEngine::default();
        let prior = ml(0.5830001, 1.4999993);
        let fused = engine.fuse(&prior, &SentimentSignal::Absent);
        assert_eq!(fused.probability_up_hybrid, prior.probability_up);
        assert_eq!(fused.expected_delta_hybrid, prior.expected_delta_bps);
        assert_eq!(fused.fusion_weight_ml, 1.0);
        assert_eq!(fused.fusion_weight_llm, 0.0);
        assert!(fused.explanation.contains("no recent news"));
    }

    #[test]
    fn test_low_confidence_collapses_exactly() {
        let engine = FusionEngine::default();
        let prior = ml(0.61, 2.7);
        let fused = engine.fuse(&prior, &news(0.9, 0.29, 9.0));
        assert_eq!(fused.probability_up_hybrid, prior.probability_up);
        assert_eq!(fused.expected_delta_hybrid, prior.expected_delta_bps);
        assert_eq!(fused.fusion_weight_llm, 0.0);
        assert!(fused.explanation.contains("low news confidence"));
    }

    #[test]
    fn test_high_impact_bullish_scenario() {
        // prior=0.58, sentiment=+0.75, confidence=0.85, impact=8.5.
        let engine = FusionEngine::default();
        let fused = engine.fuse(&ml(0.58, 2.3), &news(0.75, 0.85, 8.5));

        let w_llm = 0.4 * 0.85;
        assert!((fused.fusion_weight_llm - w_llm).abs() < 1e-12);

        let posterior = 0.58 + 0.75 * w_llm * (1.0 - 0.58);
        assert!((fused.probability_up_hybrid - posterior).abs() < 1e-12);

        let delta = 2.3 * (1.0 + 0.75 * 0.85 * w_llm * 0.5);
        assert!((fused.expected_delta_hybrid - delta).abs() < 1e-12);

        assert!(fused.explanation.contains("Technical analysis: bullish"));
        assert!(fused.explanation.contains("News sentiment: bullish"));
        assert!(fused.explanation.contains("Weights: ML=66%, News=34%"));
    }

    #[test]
    fn test_low_impact_news_is_dampened() {
        let engine = FusionEngine::default();
        let fused = engine.fuse(&ml(0.58, 2.3), &news(0.75, 0.85, 5.0));
        let w_llm = 0.4 * 0.85 * 0.4;
        assert!((fused.fusion_weight_llm - w_llm).abs() < 1e-12);
    }

    #[test]
    fn test_strong_negative_news_flips_direction() {
        let engine = FusionEngine::default();
        let fused = engine.fuse(&ml(0.6, 1.8), &news(-1.0, 1.0, 9.0));
        // posterior = 0.6 + (-1 * 0.4) * 0.6 = 0.36: majority flips down.
        assert!((fused.probability_up_hybrid - 0.36).abs() < 1e-12);
        assert!(fused.probability_up_hybrid < 0.5);
        // Bearish news shrinks the expected up-move.
        assert!(fused.expected_delta_hybrid < fused.expected_delta_ml);
    }

    #[test]
    fn test_posterior_stays_in_bounds() {
        let engine = FusionEngine::default();
        for &prior in &[0.0, 0.1, 0.5, 0.9, 1.0] {
            for &score in &[-1.0, -0.5, 0.0, 0.5, 1.0] {
                for &conf in &[0.3, 0.7, 1.0] {
                    let fused = engine.fuse(&ml(prior, 2.0), &news(score, conf, 10.0));
                    assert!(
                        (0.0..=1.0).contains(&fused.probability_up_hybrid),
                        "posterior out of bounds: prior={prior} score={score} conf={conf}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_sentiment_keeps_prior() {
        let engine = FusionEngine::default();
        let fused = engine.fuse(&ml(0.58, 2.3), &news(0.0, 0.9, 9.0));
        assert_eq!(fused.probability_up_hybrid, 0.58);
        assert_eq!(fused.expected_delta_hybrid, 2.3);
        assert!(fused.fusion_weight_llm > 0.0);
        // A weighted but flat score is labeled neutral, not bearish.
        assert!(fused.explanation.contains("News sentiment: neutral"));
    }

    #[test]
    fn test_urgency_boost_respects_cap() {
        let config = FusionConfig {
            urgency_boost_critical: 0.1,
            ..FusionConfig::default()
        };
        let engine = FusionEngine::new(config);
        let mut urgent = NewsSentiment {
            sentiment_score: 0.5,
            confidence: 0.5,
            impact_score: 8.0,
            urgency: Urgency::Critical,
            summary: String::new(),
        };
        let fused = engine.fuse(&ml(0.55, 1.0), &SentimentSignal::Present(urgent.clone()));
        // base 0.4 * 0.5 = 0.20, plus 0.10 boost.
        assert!((fused.fusion_weight_llm - 0.3).abs() < 1e-12);

        urgent.confidence = 0.95;
        let fused = engine.fuse(&ml(0.55, 1.0), &SentimentSignal::Present(urgent));
        // 0.38 + 0.10 clamps at the 0.4 ceiling.
        assert!((fused.fusion_weight_llm - 0.4).abs() < 1e-12);
    }
}
