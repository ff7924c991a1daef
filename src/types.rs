//! Core domain types

use crate::error::{Error, Result};
use crate::odds::Odds;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Probability strictly inside (0, 1)
///
/// Exactly 0 or 1 would give an infinite edge against any market, so both
/// are rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Probability(Decimal);

impl Probability {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO && value < Decimal::ONE {
            Ok(Self(value))
        } else {
            Err(Error::InvalidProbability(value.to_string()))
        }
    }

    pub fn from_f64(value: f64) -> Result<Self> {
        let d = Decimal::from_f64(value).ok_or_else(|| Error::InvalidProbability(value.to_string()))?;
        Self::new(d)
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    /// Probability of the opposite outcome
    pub fn complement(self) -> Self {
        Self(Decimal::ONE - self.0)
    }
}

impl TryFrom<Decimal> for Probability {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Probability> for Decimal {
    fn from(p: Probability) -> Self {
        p.0
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which team a bet is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Home, Side::Away];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "home"),
            Side::Away => write!(f, "away"),
        }
    }
}

/// Moneyline odds for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOdds {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_moneyline: Odds,
    pub away_moneyline: Odds,
    pub game_time: DateTime<Utc>,
}

impl GameOdds {
    pub fn new(
        game_id: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        home_moneyline: Odds,
        away_moneyline: Odds,
        game_time: DateTime<Utc>,
    ) -> Result<Self> {
        let game_id = game_id.into();
        if game_id.trim().is_empty() {
            return Err(Error::missing(game_id, "empty game id"));
        }
        Ok(Self {
            game_id,
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_moneyline,
            away_moneyline,
            game_time,
        })
    }

    pub fn moneyline(&self, side: Side) -> Odds {
        match side {
            Side::Home => self.home_moneyline,
            Side::Away => self.away_moneyline,
        }
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    /// "Away @ Home"
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

/// Model output for one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub game_id: String,
    pub predicted_home_win_prob: Probability,
}

impl ModelPrediction {
    pub fn new(game_id: impl Into<String>, predicted_home_win_prob: Decimal) -> Result<Self> {
        Ok(Self {
            game_id: game_id.into(),
            predicted_home_win_prob: Probability::new(predicted_home_win_prob)?,
        })
    }

    pub fn probability_for(&self, side: Side) -> Probability {
        match side {
            Side::Home => self.predicted_home_win_prob,
            Side::Away => self.predicted_home_win_prob.complement(),
        }
    }
}

/// Stake size bucket by amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Below `low_max` is Low, up to and including `medium_max` is Medium
    pub fn classify(stake_amount: Decimal, low_max: Decimal, medium_max: Decimal) -> Self {
        if stake_amount < low_max {
            RiskTier::Low
        } else if stake_amount <= medium_max {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Low => write!(f, "Low"),
            RiskTier::Medium => write!(f, "Medium"),
            RiskTier::High => write!(f, "High"),
        }
    }
}

/// A sized bet on one side of one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecommendation {
    pub game_id: String,
    pub side: Side,
    pub team: String,
    /// "NYY ML (+150)"
    pub pick: String,
    pub moneyline: Odds,
    /// Recommended bankroll fraction after multiplier and cap
    pub stake_fraction: Decimal,
    /// Uncapped full Kelly fraction
    pub kelly_fraction: Decimal,
    pub predicted_prob: Decimal,
    pub implied_prob: Decimal,
    pub edge: Decimal,
    pub stake_amount: Decimal,
    pub expected_value: Decimal,
    pub risk: RiskTier,
}

/// Binary game result from the home team's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Outcome {
    Loss,
    Win,
}

impl Outcome {
    pub fn as_decimal(self) -> Decimal {
        match self {
            Outcome::Loss => Decimal::ZERO,
            Outcome::Win => Decimal::ONE,
        }
    }

    pub fn is_win(self) -> bool {
        self == Outcome::Win
    }
}

impl TryFrom<u8> for Outcome {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Outcome::Loss),
            1 => Ok(Outcome::Win),
            other => Err(Error::InvalidOutcome(other)),
        }
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Loss => 0,
            Outcome::Win => 1,
        }
    }
}

impl From<bool> for Outcome {
    fn from(won: bool) -> Self {
        if won {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }
}

/// Finalized (prediction, outcome) pair in the calibration log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub game_id: String,
    pub predicted_prob: Probability,
    pub actual_outcome: Outcome,
    pub timestamp: DateTime<Utc>,
}

/// Engineered features for one game, as produced by the feature builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameFeatures {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub game_time: DateTime<Utc>,
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

/// Final score report for a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub game_id: String,
    pub home_runs: u32,
    pub away_runs: u32,
    #[serde(rename = "final", default = "default_final")]
    pub is_final: bool,
}

fn default_final() -> bool {
    true
}

impl GameOutcome {
    /// Home win = 1. Games not yet final have no outcome.
    pub fn home_outcome(&self) -> Option<Outcome> {
        if !self.is_final {
            return None;
        }
        Some(Outcome::from(self.home_runs > self.away_runs))
    }
}
