//! MLB Moneyline Edge
//!
//! Sizes moneyline bets from model win probabilities and tracks how well
//! those probabilities are calibrated against real outcomes.
//!
//! ## Architecture
//!
//! ```text
//! Slate (features + odds) → Model → Recalibration → BetRecommender → tomorrow_bets.json
//!                              ↓                         ↑
//!                       pending predictions        KellySizer + OddsConverter
//!                              ↓
//! Outcomes → CalibrationTracker → calibration_log.db → Metrics / Recalibration fit
//! ```

pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod odds;
pub mod pipeline;
pub mod storage;
pub mod strategy;
pub mod types;

#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod config_tests;
