//! Win probability models
//!
//! The predictive model is opaque to the rest of the system: anything that
//! maps a game's engineered features to a home-win probability. Outputs are
//! untrusted and validated by the caller.

mod logistic;

pub use logistic::{FeatureScaling, LogisticModel};

use crate::error::Result;
use crate::types::GameFeatures;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for home-win probability models
#[async_trait]
pub trait ProbabilityModel: Send + Sync {
    /// Raw home-win probability for one game
    async fn predict(&self, game: &GameFeatures) -> Result<Decimal>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// Model that returns the same probability for every game
///
/// Useful as a market-agnostic baseline.
pub struct ConstantModel {
    probability: Decimal,
}

impl ConstantModel {
    pub fn new(probability: Decimal) -> Self {
        Self { probability }
    }
}

#[async_trait]
impl ProbabilityModel for ConstantModel {
    async fn predict(&self, _game: &GameFeatures) -> Result<Decimal> {
        Ok(self.probability)
    }

    fn name(&self) -> &str {
        "constant"
    }
}
