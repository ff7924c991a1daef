//! Logistic regression over standardized features
//!
//! Weights are exported from the training job as JSON:
//!
//! ```json
//! {
//!   "name": "mlb_winprob_v1",
//!   "intercept": 0.08,
//!   "weights": { "home_sp_era_diff": -0.31, "home_run_diff_l10": 0.12 },
//!   "scaling": { "home_sp_era_diff": { "mean": 0.0, "std": 1.2 } }
//! }
//! ```

use super::ProbabilityModel;
use crate::error::{Error, Result};
use crate::types::GameFeatures;
use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Saturated scores map to the nearest representable probability
const PROB_FLOOR: Decimal = dec!(0.000001);
const PROB_CEIL: Decimal = dec!(0.999999);

/// Standard-scaler parameters for one feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaling {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default = "default_name")]
    name: String,
    intercept: f64,
    weights: BTreeMap<String, f64>,
    #[serde(default)]
    scaling: BTreeMap<String, FeatureScaling>,
}

fn default_name() -> String {
    "logistic".to_string()
}

impl LogisticModel {
    pub fn new(intercept: f64, weights: BTreeMap<String, f64>) -> Self {
        Self {
            name: default_name(),
            intercept,
            weights,
            scaling: BTreeMap::new(),
        }
    }

    pub fn with_scaling(mut self, scaling: BTreeMap<String, FeatureScaling>) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path).await?;
        let model: Self = serde_json::from_str(&data)?;
        model.validate()?;
        tracing::info!(
            "Loaded model '{}' with {} features from {}",
            model.name,
            model.weights.len(),
            path.display()
        );
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if !self.intercept.is_finite() || self.weights.values().any(|w| !w.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "model '{}' has non-finite coefficients",
                self.name
            )));
        }
        if let Some((name, _)) = self.scaling.iter().find(|(_, s)| !(s.std > 0.0)) {
            return Err(Error::InvalidConfig(format!(
                "model '{}' has non-positive std for feature {}",
                self.name, name
            )));
        }
        Ok(())
    }

    /// Features the model expects
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    fn linear_score(&self, game: &GameFeatures) -> Result<f64> {
        let mut z = self.intercept;
        for (name, weight) in &self.weights {
            let raw = game
                .features
                .get(name)
                .copied()
                .ok_or_else(|| Error::missing(&game.game_id, format!("feature '{}' not present", name)))?;
            if !raw.is_finite() {
                return Err(Error::missing(&game.game_id, format!("feature '{}' is not finite", name)));
            }
            let x = match self.scaling.get(name) {
                Some(s) => (raw - s.mean) / s.std,
                None => raw,
            };
            z += weight * x;
        }
        Ok(z)
    }
}

#[async_trait]
impl ProbabilityModel for LogisticModel {
    async fn predict(&self, game: &GameFeatures) -> Result<Decimal> {
        let z = self.linear_score(game)?;
        let p = 1.0 / (1.0 + (-z).exp());
        let d = Decimal::from_f64(p).ok_or_else(|| Error::InvalidProbability(p.to_string()))?;
        // Round toward 0.5 so rounding alone never lands on 0 or 1
        let strategy = if d >= dec!(0.5) {
            RoundingStrategy::ToZero
        } else {
            RoundingStrategy::AwayFromZero
        };
        Ok(d.round_dp_with_strategy(6, strategy).clamp(PROB_FLOOR, PROB_CEIL))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
