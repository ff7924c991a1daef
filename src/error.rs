//! Error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid odds: {0}")]
    InvalidOdds(String),

    #[error("Invalid probability {0}: must be strictly between 0 and 1")]
    InvalidProbability(String),

    #[error("Missing game data for {game_id}: {reason}")]
    MissingGameData { game_id: String, reason: String },

    #[error("Duplicate calibration record for game {0}")]
    DuplicateRecord(String),

    #[error("Invalid outcome {0}: must be 0 or 1")]
    InvalidOutcome(u8),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {required} samples, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn missing(game_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MissingGameData {
            game_id: game_id.into(),
            reason: reason.into(),
        }
    }

    /// Per-game errors that should skip a single game rather than abort the batch
    pub fn is_per_game(&self) -> bool {
        matches!(
            self,
            Error::InvalidOdds(_)
                | Error::InvalidProbability(_)
                | Error::MissingGameData { .. }
                | Error::DuplicateRecord(_)
                | Error::InvalidOutcome(_)
        )
    }
}
