//! File-backed model registry: serialized smartcore forests next to a
//! `registry.json` index keyed by `(pair, horizon)`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::application::predictor::{ModelStore, ScoreModel, TrainedPredictor};
use crate::domain::horizon::Horizon;
use crate::domain::pair::CurrencyPair;

const REGISTRY_FILE: &str = "registry.json";

/// Registry entry for one trained model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model_id: String,
    pub pair: CurrencyPair,
    pub horizon: Horizon,
    pub created_at: DateTime<Utc>,
}

/// Models directory layout: `{model_id}.json` per artifact plus the registry
/// index. Reads are tolerant of a missing directory; that just means no
/// trained models yet.
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn registry_path(&self) -> PathBuf {
        self.dir.join(REGISTRY_FILE)
    }

    fn model_path(&self, model_id: &str) -> PathBuf {
        self.dir.join(format!("{model_id}.json"))
    }

    fn read_registry(&self) -> Result<Vec<ModelRecord>> {
        let path = self.registry_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read model registry {path:?}"))?;
        serde_json::from_str(&content).context("Failed to parse model registry JSON")
    }

    /// Persist a fitted model and register it. Registry writes go through a
    /// temp file and rename so a crash never leaves a torn index.
    pub fn save(&self, model: &ScoreModel, record: ModelRecord) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).context("Failed to create models directory")?;
        }

        let model_json = serde_json::to_string(model).context("Failed to serialize model")?;
        fs::write(self.model_path(&record.model_id), model_json)
            .context("Failed to write model artifact")?;

        let mut registry = self.read_registry()?;
        registry.retain(|r| r.model_id != record.model_id);
        registry.push(record.clone());
        let content =
            serde_json::to_string_pretty(&registry).context("Failed to serialize registry")?;
        let temp_path = self.registry_path().with_extension("tmp");
        fs::write(&temp_path, content).context("Failed to write temp registry")?;
        fs::rename(&temp_path, self.registry_path()).context("Failed to rename registry")?;

        info!(model_id = %record.model_id, pair = %record.pair, horizon = %record.horizon, "model saved");
        Ok(())
    }
}

impl ModelStore for FileModelStore {
    fn load(&self, model_id: &str) -> Result<TrainedPredictor> {
        let path = self.model_path(model_id);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read model artifact {path:?}"))?;
        let model: ScoreModel =
            serde_json::from_str(&content).context("Failed to parse model artifact")?;
        Ok(TrainedPredictor::new(model, model_id.to_string()))
    }

    fn latest(&self, pair: &CurrencyPair, horizon: Horizon) -> Result<Option<String>> {
        let registry = match self.read_registry() {
            Ok(registry) => registry,
            Err(e) => {
                // A corrupt index should not take forecasting down; the
                // caller falls back to the baseline.
                warn!(error = %e, "model registry unreadable");
                return Ok(None);
            }
        };

        Ok(registry
            .into_iter()
            .filter(|r| &r.pair == pair && r.horizon == horizon)
            // Tie-break on model_id so equal timestamps resolve the same way
            // on every run.
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.model_id.cmp(&b.model_id))
            })
            .map(|r| r.model_id))
    }
}
