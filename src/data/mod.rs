//! File I/O for the daily slate, game outcomes and bet output
//!
//! The slate is produced by the feature builder: one JSON object per game
//! with moneylines and engineered features. Malformed games are rejected
//! individually so one bad row does not sink the day.

use crate::error::{Error, Result};
use crate::odds::{Odds, OddsInput};
use crate::strategy::SkippedGame;
use crate::types::{BetRecommendation, GameFeatures, GameOdds, GameOutcome};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// One game as it appears in the slate file
#[derive(Debug, Clone, Deserialize)]
pub struct SlateRow {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub game_time: DateTime<Utc>,
    pub home_moneyline: OddsInput,
    pub away_moneyline: OddsInput,
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

impl SlateRow {
    pub fn into_game(self) -> Result<SlateGame> {
        let home = Odds::try_from(self.home_moneyline)?;
        let away = Odds::try_from(self.away_moneyline)?;
        let odds = GameOdds::new(
            self.game_id.clone(),
            self.home_team.clone(),
            self.away_team.clone(),
            home,
            away,
            self.game_time,
        )?;
        Ok(SlateGame {
            features: GameFeatures {
                game_id: self.game_id,
                home_team: self.home_team,
                away_team: self.away_team,
                game_time: self.game_time,
                features: self.features,
            },
            odds,
        })
    }
}

/// Validated features and odds for one game
#[derive(Debug, Clone, PartialEq)]
pub struct SlateGame {
    pub features: GameFeatures,
    pub odds: GameOdds,
}

#[derive(Debug, Default)]
pub struct Slate {
    pub games: Vec<SlateGame>,
    pub rejected: Vec<SkippedGame>,
}

/// Outcome rows that parsed, plus the ones that did not
#[derive(Debug, Default)]
pub struct Outcomes {
    pub outcomes: Vec<GameOutcome>,
    pub rejected: Vec<SkippedGame>,
}

/// Best-effort id for a row that failed to parse
fn row_id(row: &Value, index: usize) -> String {
    match row.get("game_id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("row {}", index),
    }
}

fn parse_row<T: DeserializeOwned>(row: Value, index: usize) -> std::result::Result<T, SkippedGame> {
    let game_id = row_id(&row, index);
    serde_json::from_value(row).map_err(|e| SkippedGame {
        error: Error::missing(&game_id, format!("malformed row: {}", e)),
        game_id,
    })
}

/// Validate raw rows, keeping good games and collecting rejects
pub fn build_slate(rows: Vec<Value>) -> Slate {
    let mut slate = Slate::default();
    for (index, row) in rows.into_iter().enumerate() {
        let parsed = parse_row::<SlateRow>(row, index).and_then(|row| {
            let game_id = row.game_id.clone();
            row.into_game().map_err(|error| SkippedGame { game_id, error })
        });
        match parsed {
            Ok(game) => slate.games.push(game),
            Err(skipped) => {
                tracing::warn!("Rejected slate row {}: {}", skipped.game_id, skipped.error);
                slate.rejected.push(skipped);
            }
        }
    }
    slate
}

pub fn build_outcomes(rows: Vec<Value>) -> Outcomes {
    let mut result = Outcomes::default();
    for (index, row) in rows.into_iter().enumerate() {
        match parse_row::<GameOutcome>(row, index) {
            Ok(outcome) => result.outcomes.push(outcome),
            Err(skipped) => {
                tracing::warn!("Rejected outcome row {}: {}", skipped.game_id, skipped.error);
                result.rejected.push(skipped);
            }
        }
    }
    result
}

pub async fn load_slate(path: impl AsRef<Path>) -> Result<Slate> {
    let path = path.as_ref();
    let data = tokio::fs::read_to_string(path).await?;
    let rows: Vec<Value> = serde_json::from_str(&data)?;
    let slate = build_slate(rows);
    tracing::info!(
        "Loaded {} games from {} ({} rejected)",
        slate.games.len(),
        path.display(),
        slate.rejected.len()
    );
    Ok(slate)
}

pub async fn load_outcomes(path: impl AsRef<Path>) -> Result<Outcomes> {
    let path = path.as_ref();
    let data = tokio::fs::read_to_string(path).await?;
    let rows: Vec<Value> = serde_json::from_str(&data)?;
    let outcomes = build_outcomes(rows);
    tracing::info!(
        "Loaded {} game outcomes from {} ({} rejected)",
        outcomes.outcomes.len(),
        path.display(),
        outcomes.rejected.len()
    );
    Ok(outcomes)
}

pub async fn write_recommendations(path: impl AsRef<Path>, recs: &[BetRecommendation]) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(recs)?;
    tokio::fs::write(path, json).await?;
    tracing::info!("Wrote {} rows to {}", recs.len(), path.display());
    Ok(())
}

pub async fn read_recommendations(path: impl AsRef<Path>) -> Result<Vec<BetRecommendation>> {
    let data = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&data).map_err(Error::from)
}
