//! Predictor abstraction: a trained smartcore model behind the same trait as
//! the neutral baseline, plus the total model-selection chain.

use anyhow::Result;
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::{debug, warn};

use crate::domain::features::FeatureVector;
use crate::domain::forecast::MlPrediction;
use crate::domain::horizon::Horizon;
use crate::domain::pair::CurrencyPair;

/// Reported confidence of a healthy trained model. The score models carry no
/// calibrated confidence of their own.
const TRAINED_MODEL_CONFIDENCE: f64 = 0.65;

pub const BASELINE_MODEL_ID: &str = "baseline_v0";

/// Interface for directional forecast models.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> MlPrediction;

    fn model_id(&self) -> &str;
}

/// Registry of trained models keyed by `(pair, horizon)`.
pub trait ModelStore: Send + Sync {
    fn load(&self, model_id: &str) -> Result<TrainedPredictor>;

    /// Identifier of the most recently trained model for the key, if any.
    fn latest(&self, pair: &CurrencyPair, horizon: Horizon) -> Result<Option<String>>;
}

/// Neutral fallback: an even coin with no expected move and zero confidence.
/// Zero confidence downstream turns the recommendation into `PARTIAL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselinePredictor;

impl Predictor for BaselinePredictor {
    fn predict(&self, _features: &FeatureVector) -> MlPrediction {
        MlPrediction {
            probability_up: 0.5,
            expected_delta_bps: 0.0,
            confidence: 0.0,
            model_id: BASELINE_MODEL_ID.to_string(),
        }
    }

    fn model_id(&self) -> &str {
        BASELINE_MODEL_ID
    }
}

pub type ScoreModel = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// A fitted score model producing an up-move probability in [0, 1].
///
/// The expected move is derived from the recent drift, signed by how far the
/// score sits from even odds: `(2p - 1) * drift * 10_000` bps.
pub struct TrainedPredictor {
    model: ScoreModel,
    model_id: String,
}

impl TrainedPredictor {
    pub fn new(model: ScoreModel, model_id: String) -> Self {
        Self { model, model_id }
    }

    fn neutral(&self) -> MlPrediction {
        MlPrediction {
            probability_up: 0.5,
            expected_delta_bps: 0.0,
            confidence: 0.0,
            model_id: self.model_id.clone(),
        }
    }
}

impl Predictor for TrainedPredictor {
    fn predict(&self, features: &FeatureVector) -> MlPrediction {
        let Some(input) = features.to_model_input() else {
            warn!(model_id = %self.model_id, "incomplete features reached trained model");
            return self.neutral();
        };

        let matrix = match DenseMatrix::from_2d_vec(&vec![input]) {
            Ok(m) => m,
            Err(e) => {
                warn!(model_id = %self.model_id, error = %e, "matrix creation failed");
                return self.neutral();
            }
        };

        let score = match self.model.predict(&matrix) {
            Ok(scores) => match scores.first() {
                Some(s) => *s,
                None => {
                    warn!(model_id = %self.model_id, "model returned no prediction");
                    return self.neutral();
                }
            },
            Err(e) => {
                warn!(model_id = %self.model_id, error = %e, "prediction failed");
                return self.neutral();
            }
        };

        let probability_up = score.clamp(0.0, 1.0);
        let drift = features.drift_1m.unwrap_or(0.0);
        let expected_delta_bps = (2.0 * probability_up - 1.0) * drift * 10_000.0;

        debug!(model_id = %self.model_id, probability_up, expected_delta_bps, "model scored");

        MlPrediction {
            probability_up,
            expected_delta_bps,
            confidence: TRAINED_MODEL_CONFIDENCE,
            model_id: self.model_id.clone(),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Deterministic, total predictor selection: explicit identifier, then the
/// configured default, then the most recent model for the key, then the
/// baseline. Load failures log and fall through; this function never fails.
pub fn resolve_predictor(
    store: &dyn ModelStore,
    explicit_id: Option<&str>,
    default_id: Option<&str>,
    pair: &CurrencyPair,
    horizon: Horizon,
) -> Box<dyn Predictor> {
    for id in [explicit_id, default_id].into_iter().flatten() {
        match store.load(id) {
            Ok(predictor) => return Box::new(predictor),
            Err(e) => warn!(model_id = id, error = %e, "model load failed"),
        }
    }

    match store.latest(pair, horizon) {
        Ok(Some(id)) => match store.load(&id) {
            Ok(predictor) => return Box::new(predictor),
            Err(e) => warn!(model_id = %id, error = %e, "latest model load failed"),
        },
        Ok(None) => debug!(pair = %pair, horizon = %horizon, "no trained model registered"),
        Err(e) => warn!(pair = %pair, horizon = %horizon, error = %e, "model registry lookup failed"),
    }

    Box::new(BaselinePredictor)
}
