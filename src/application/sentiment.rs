//! Sentiment aggregator: reduces per-article sentiment records in a trailing
//! window to one [`SentimentSignal`] for a pair.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::domain::pair::CurrencyPair;
use crate::domain::sentiment::{ArticleSentiment, NewsSentiment, SentimentSignal, Urgency};

#[derive(Debug, Clone)]
pub struct SentimentAggregator {
    /// Floor for the recency weight of the oldest in-window article.
    pub min_recency_weight: f64,
    /// Impact at or above which an article's explanation feeds the summary.
    pub explanation_impact_threshold: f64,
    /// At most this many upstream explanations are quoted in the summary.
    pub max_explanations: usize,
}

impl Default for SentimentAggregator {
    fn default() -> Self {
        Self {
            min_recency_weight: 0.1,
            explanation_impact_threshold: 7.0,
            max_explanations: 3,
        }
    }
}

impl SentimentAggregator {
    /// Aggregate the articles falling inside `(now - lookback, now]` that
    /// mention either leg of the pair.
    ///
    /// Per-article weight is recency times confidence; the pair-level score
    /// is the weighted mean of net base-minus-quote sentiment. Impact and
    /// urgency take the maximum over contributors so one major story
    /// dominates. An empty window yields [`SentimentSignal::Absent`], never
    /// a zero-score sentiment.
    pub fn aggregate(
        &self,
        articles: &[ArticleSentiment],
        pair: &CurrencyPair,
        now: DateTime<Utc>,
        lookback: Duration,
    ) -> SentimentSignal {
        let cutoff = now - lookback;
        let contributing: Vec<&ArticleSentiment> = articles
            .iter()
            .filter(|a| a.timestamp > cutoff && a.timestamp <= now)
            .filter(|a| a.mentions(pair.base()) || a.mentions(pair.quote()))
            .collect();

        if contributing.is_empty() {
            debug!(pair = %pair, "no articles in window");
            return SentimentSignal::Absent;
        }

        let lookback_secs = lookback.num_seconds().max(1) as f64;
        let mut weighted_sentiment = 0.0;
        let mut total_weight = 0.0;
        let mut impact_score: f64 = 0.0;
        let mut urgency = Urgency::Low;
        let mut explanations: Vec<&str> = Vec::new();

        // Most recent first, so quoted explanations favor the latest story.
        for article in contributing.iter().rev() {
            let age_frac = (now - article.timestamp).num_seconds() as f64 / lookback_secs;
            let recency_weight = (1.0 - age_frac).max(self.min_recency_weight);
            let weight = recency_weight * article.confidence;

            let base_sentiment = article
                .sentiment_for(pair.base())
                .unwrap_or(article.sentiment_overall);
            let quote_sentiment = article.sentiment_for(pair.quote()).unwrap_or(0.0);
            let net_sentiment = base_sentiment - quote_sentiment;

            weighted_sentiment += net_sentiment * weight;
            total_weight += weight;
            impact_score = impact_score.max(article.impact_score);
            urgency = urgency.max(article.urgency);

            if article.impact_score >= self.explanation_impact_threshold
                && !article.explanation.is_empty()
                && explanations.len() < self.max_explanations
            {
                explanations.push(&article.explanation);
            }
        }

        if total_weight <= 0.0 {
            debug!(pair = %pair, "all in-window articles carried zero weight");
            return SentimentSignal::Absent;
        }

        let sentiment_score = (weighted_sentiment / total_weight).clamp(-1.0, 1.0);
        let confidence = (total_weight / contributing.len() as f64).clamp(0.0, 1.0);
        let summary = self.summarize(pair, sentiment_score, impact_score, &explanations);

        info!(
            pair = %pair,
            sentiment = sentiment_score,
            impact = impact_score,
            confidence,
            articles = contributing.len(),
            "sentiment aggregated"
        );

        SentimentSignal::Present(NewsSentiment {
            sentiment_score,
            confidence,
            impact_score,
            urgency,
            summary,
        })
    }

    fn summarize(
        &self,
        pair: &CurrencyPair,
        sentiment: f64,
        impact: f64,
        explanations: &[&str],
    ) -> String {
        let direction = if sentiment > 0.3 {
            format!("{} bullish vs {}", pair.base(), pair.quote())
        } else if sentiment < -0.3 {
            format!("{} bearish vs {}", pair.base(), pair.quote())
        } else {
            "mixed signals".to_string()
        };

        let impact_desc = if impact >= 8.0 {
            "high-impact"
        } else if impact >= 6.0 {
            "moderate-impact"
        } else {
            "low-impact"
        };

        let mut summary = format!("Recent news: {direction} ({impact_desc})");
        if let Some(key) = explanations.first() {
            let snippet: String = key.chars().take(100).collect();
            summary.push_str(&format!(" | Key: {snippet}"));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn pair() -> CurrencyPair {
        CurrencyPair::from_str("USDINR").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn article(age_minutes: i64, usd: f64, inr: f64, confidence: f64) -> ArticleSentiment {
        ArticleSentiment {
            timestamp: now() - Duration::minutes(age_minutes),
            currencies: vec!["USD".into(), "INR".into()],
            sentiment_overall: usd,
            sentiment_by_currency: HashMap::from([
                ("USD".to_string(), usd),
                ("INR".to_string(), inr),
            ]),
            confidence,
            impact_score: 5.0,
            urgency: Urgency::Low,
            explanation: String::new(),
        }
    }

    #[test]
    fn test_empty_window_is_absent_not_neutral() {
        let agg = SentimentAggregator::default();
        let signal = agg.aggregate(&[], &pair(), now(), Duration::hours(1));
        assert!(signal.is_absent());
        assert_eq!(signal.as_present(), None);
    }

    #[test]
    fn test_stale_articles_are_absent() {
        let agg = SentimentAggregator::default();
        let stale = article(120, 0.8, 0.0, 0.9);
        let signal = agg.aggregate(&[stale], &pair(), now(), Duration::hours(1));
        assert!(signal.is_absent());
    }

    #[test]
    fn test_unrelated_currency_is_ignored() {
        let agg = SentimentAggregator::default();
        let mut a = article(10, 0.8, 0.0, 0.9);
        a.currencies = vec!["EUR".into(), "JPY".into()];
        let signal = agg.aggregate(&[a], &pair(), now(), Duration::hours(1));
        assert!(signal.is_absent());
    }

    #[test]
    fn test_single_article_net_sentiment() {
        let agg = SentimentAggregator::default();
        let a = article(30, 0.6, -0.2, 0.8);
        let signal = agg.aggregate(&[a], &pair(), now(), Duration::hours(1));
        let s = signal.as_present().unwrap();
        // Net = base - quote regardless of weighting with one article.
        assert!((s.sentiment_score - 0.8).abs() < 1e-12);
        // Confidence = recency (0.5 at half-window) * article confidence.
        assert!((s.confidence - 0.5 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_impact_and_urgency_take_maximum() {
        let agg = SentimentAggregator::default();
        let mut calm = article(10, 0.1, 0.0, 0.9);
        calm.impact_score = 3.0;
        let mut shock = article(40, -0.5, 0.0, 0.6);
        shock.impact_score = 9.0;
        shock.urgency = Urgency::Critical;
        shock.explanation = "central bank surprise".to_string();

        let signal = agg.aggregate(&[shock, calm], &pair(), now(), Duration::hours(1));
        let s = signal.as_present().unwrap();
        assert_eq!(s.impact_score, 9.0);
        assert_eq!(s.urgency, Urgency::Critical);
        assert!(s.summary.contains("Key: central bank surprise"));
    }

    #[test]
    fn test_recent_articles_weigh_more() {
        let agg = SentimentAggregator::default();
        let recent = article(5, 1.0, 0.0, 0.8);
        let old = article(55, -1.0, 0.0, 0.8);
        let signal = agg.aggregate(&[old, recent], &pair(), now(), Duration::hours(1));
        let s = signal.as_present().unwrap();
        assert!(s.sentiment_score > 0.0);
    }

    #[test]
    fn test_summary_direction_bands() {
        let agg = SentimentAggregator::default();
        let bullish = agg.summarize(&pair(), 0.6, 8.5, &[]);
        assert!(bullish.contains("USD bullish vs INR"));
        assert!(bullish.contains("high-impact"));

        let bearish = agg.summarize(&pair(), -0.6, 6.5, &[]);
        assert!(bearish.contains("USD bearish vs INR"));
        assert!(bearish.contains("moderate-impact"));

        let mixed = agg.summarize(&pair(), 0.1, 2.0, &[]);
        assert!(mixed.contains("mixed signals"));
        assert!(mixed.contains("low-impact"));
    }
}
