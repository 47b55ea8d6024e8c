//! Advisor configuration parsing from environment variables.
//!
//! Everything has a working default; the environment only tunes. Call sites
//! translate this into [`AdvisorSettings`] and the fusion/policy configs.

use anyhow::{Context, Result};
use chrono::Duration;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::application::advisor::AdvisorSettings;
use crate::application::fusion::FusionConfig;
use crate::application::policy::PolicyConfig;
use crate::domain::forecast::PolicyKind;

/// Advisor environment configuration.
#[derive(Debug, Clone)]
pub struct AdvisorEnvConfig {
    // Decision policy
    pub policy: PolicyKind,
    pub spread_bps: f64,
    pub prob_threshold: f64,
    pub embargo_minutes: i64,

    // Models
    pub default_model_id: Option<String>,
    pub models_dir: PathBuf,

    // News fusion
    pub enable_llm_fusion: bool,
    pub llm_max_weight: f64,
    pub llm_min_confidence: f64,
    pub llm_high_impact_threshold: f64,
    pub llm_low_impact_dampening: f64,

    // Lookback windows
    pub sentiment_lookback_minutes: i64,
    pub bar_lookback_minutes: i64,
}

impl AdvisorEnvConfig {
    pub fn from_env() -> Result<Self> {
        let policy_str = env::var("DECISION_POLICY").unwrap_or_else(|_| "expected".to_string());
        let policy = PolicyKind::from_str(&policy_str).context("Failed to parse DECISION_POLICY")?;

        Ok(Self {
            policy,
            spread_bps: Self::parse_f64("DECISION_SPREAD_BPS", 2.0)?,
            prob_threshold: Self::parse_f64("DECISION_PROB_TH", 0.6)?,
            embargo_minutes: Self::parse_i64("DECISION_EMBARGO_MIN", 0)?,
            default_model_id: env::var("DEFAULT_MODEL_ID").ok().filter(|s| !s.is_empty()),
            models_dir: PathBuf::from(
                env::var("MODELS_DIR").unwrap_or_else(|_| "models".to_string()),
            ),
            enable_llm_fusion: Self::parse_bool("ENABLE_LLM_FUSION", true),
            llm_max_weight: Self::parse_f64("LLM_MAX_WEIGHT", 0.4)?,
            llm_min_confidence: Self::parse_f64("LLM_MIN_CONFIDENCE", 0.3)?,
            llm_high_impact_threshold: Self::parse_f64("LLM_HIGH_IMPACT_THRESHOLD", 7.0)?,
            llm_low_impact_dampening: Self::parse_f64("LLM_LOW_IMPACT_DAMPENING", 0.4)?,
            sentiment_lookback_minutes: Self::parse_i64("SENTIMENT_LOOKBACK_MINUTES", 60)?,
            bar_lookback_minutes: Self::parse_i64("BAR_LOOKBACK_MINUTES", 360)?,
        })
    }

    pub fn policy_config(&self) -> PolicyConfig {
        PolicyConfig {
            policy: self.policy,
            spread_bps: self.spread_bps,
            prob_threshold: self.prob_threshold,
            embargo_minutes: self.embargo_minutes,
        }
    }

    pub fn fusion_config(&self) -> FusionConfig {
        FusionConfig {
            max_llm_weight: self.llm_max_weight,
            min_confidence: self.llm_min_confidence,
            high_impact_threshold: self.llm_high_impact_threshold,
            low_impact_dampening: self.llm_low_impact_dampening,
            ..FusionConfig::default()
        }
    }

    pub fn advisor_settings(&self) -> AdvisorSettings {
        AdvisorSettings {
            policy: self.policy_config(),
            fusion: self.fusion_config(),
            default_model_id: self.default_model_id.clone(),
            enable_fusion: self.enable_llm_fusion,
            sentiment_lookback: Duration::minutes(self.sentiment_lookback_minutes),
            bar_lookback: Duration::minutes(self.bar_lookback_minutes),
        }
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_i64(key: &str, default: i64) -> Result<i64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<i64>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<bool>()
            .unwrap_or(default)
    }
}
