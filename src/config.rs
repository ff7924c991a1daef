//! Configuration management
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (optional)
//! 3. Environment, e.g. `MONEYLINE__KELLY__FRACTION=0.5`

use crate::calibration::CalibrationMethod;
use crate::error::{Error, Result};
use config::{Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub kelly: KellyConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub bankroll: BankrollConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Fractional Kelly sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KellyConfig {
    /// Multiplier on full Kelly (0.25 = quarter Kelly)
    #[serde(default = "default_kelly_fraction")]
    pub fraction: Decimal,
    /// Maximum stake as a fraction of bankroll
    #[serde(default = "default_max_stake_pct")]
    pub max_stake_pct: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendConfig {
    /// Minimum model edge over the implied probability
    #[serde(default = "default_min_edge")]
    pub min_edge: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BankrollConfig {
    #[serde(default = "default_bankroll")]
    pub size: Decimal,
    /// Stakes below this amount are Low risk
    #[serde(default = "default_low_risk_max")]
    pub low_risk_max: Decimal,
    /// Stakes up to this amount are Medium risk, above are High
    #[serde(default = "default_medium_risk_max")]
    pub medium_risk_max: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_bin_count")]
    pub bin_count: usize,
    #[serde(default)]
    pub method: CalibrationMethod,
    /// Finalized records required before a recalibration fit
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_slate_path")]
    pub slate: String,
    #[serde(default = "default_model_path")]
    pub model: String,
    /// Fitted recalibration layer; applied when the file exists
    #[serde(default = "default_calibrator_path")]
    pub calibrator: String,
    #[serde(default = "default_recommendations_path")]
    pub recommendations: String,
    #[serde(default = "default_outcomes_path")]
    pub outcomes: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_kelly_fraction() -> Decimal {
    dec!(0.25)
}
fn default_max_stake_pct() -> Decimal {
    dec!(0.05)
}
fn default_min_edge() -> Decimal {
    dec!(0.02)
}
fn default_bankroll() -> Decimal {
    dec!(130)
}
fn default_low_risk_max() -> Decimal {
    dec!(15)
}
fn default_medium_risk_max() -> Decimal {
    dec!(30)
}
fn default_bin_count() -> usize {
    10
}
fn default_min_samples() -> usize {
    30
}
fn default_slate_path() -> String {
    "tomorrows_games_features.json".to_string()
}
fn default_model_path() -> String {
    "mlb_winprob_model.json".to_string()
}
fn default_calibrator_path() -> String {
    "mlb_winprob_calibrator.json".to_string()
}
fn default_recommendations_path() -> String {
    "tomorrow_bets.json".to_string()
}
fn default_outcomes_path() -> String {
    "game_outcomes.json".to_string()
}
fn default_db_path() -> String {
    "calibration_log.db".to_string()
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            fraction: default_kelly_fraction(),
            max_stake_pct: default_max_stake_pct(),
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            min_edge: default_min_edge(),
        }
    }
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            size: default_bankroll(),
            low_risk_max: default_low_risk_max(),
            medium_risk_max: default_medium_risk_max(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            bin_count: default_bin_count(),
            method: CalibrationMethod::default(),
            min_samples: default_min_samples(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            slate: default_slate_path(),
            model: default_model_path(),
            calibrator: default_calibrator_path(),
            recommendations: default_recommendations_path(),
            outcomes: default_outcomes_path(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Config {
    /// Load from an optional TOML file plus `MONEYLINE__*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MONEYLINE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = cfg.try_deserialize()?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Expand `~` and `$VAR` in file paths
    pub fn expand_paths(&mut self) {
        let expand = |p: &mut String| {
            if let Ok(expanded) = shellexpand::full(p.as_str()) {
                *p = expanded.into_owned();
            }
        };
        expand(&mut self.paths.slate);
        expand(&mut self.paths.model);
        expand(&mut self.paths.calibrator);
        expand(&mut self.paths.recommendations);
        expand(&mut self.paths.outcomes);
        expand(&mut self.database.path);
    }

    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: Decimal| {
            if v <= Decimal::ZERO || v > Decimal::ONE {
                Err(Error::InvalidConfig(format!("{} must be in (0, 1], got {}", name, v)))
            } else {
                Ok(())
            }
        };
        unit("kelly.fraction", self.kelly.fraction)?;
        unit("kelly.max_stake_pct", self.kelly.max_stake_pct)?;

        if self.recommend.min_edge < Decimal::ZERO || self.recommend.min_edge >= Decimal::ONE {
            return Err(Error::InvalidConfig(format!(
                "recommend.min_edge must be in [0, 1), got {}",
                self.recommend.min_edge
            )));
        }
        if self.bankroll.size <= Decimal::ZERO {
            return Err(Error::InvalidConfig(format!(
                "bankroll.size must be positive, got {}",
                self.bankroll.size
            )));
        }
        if self.bankroll.low_risk_max > self.bankroll.medium_risk_max {
            return Err(Error::InvalidConfig(
                "bankroll.low_risk_max must not exceed bankroll.medium_risk_max".to_string(),
            ));
        }
        if self.calibration.bin_count == 0 {
            return Err(Error::InvalidConfig("calibration.bin_count must be at least 1".to_string()));
        }
        if self.calibration.min_samples < 2 {
            return Err(Error::InvalidConfig("calibration.min_samples must be at least 2".to_string()));
        }
        Ok(())
    }
}
