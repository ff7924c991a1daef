//! SQLite persistence for the calibration log
//!
//! Two tables:
//! - `pending_predictions`: one row per game awaiting an outcome
//! - `calibration_log`: append-only finalized records, unique per game

use crate::error::{Error, Result};
use crate::types::{CalibrationRecord, Outcome, Probability};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;


/// Durable backing for the calibration tracker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalibrationStore: Send + Sync {
    /// Insert or replace a pending prediction
    async fn save_pending(&self, game_id: &str, predicted_prob: Probability) -> Result<()>;

    async fn load_pending(&self) -> Result<Vec<(String, Probability)>>;

    /// Append a finalized record and clear its pending row
    ///
    /// Fails with `DuplicateRecord` if the game is already in the log.
    async fn append(&self, record: &CalibrationRecord) -> Result<()>;

    /// All finalized records in insertion order
    async fn load_records(&self) -> Result<Vec<CalibrationRecord>>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file at `path`
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        tracing::info!("Calibration log opened at {}", path);
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pending_predictions (
                game_id TEXT PRIMARY KEY,
                predicted_prob TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS calibration_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id TEXT NOT NULL UNIQUE,
                predicted_prob TEXT NOT NULL,
                actual_outcome INTEGER NOT NULL CHECK (actual_outcome IN (0, 1)),
                recorded_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_probability(game_id: &str, raw: &str) -> Result<Probability> {
    let value = Decimal::from_str(raw).map_err(|e| {
        Error::InvalidProbability(format!("'{}' stored for game {}: {}", raw, game_id, e))
    })?;
    Probability::new(value)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl CalibrationStore for Database {
    async fn save_pending(&self, game_id: &str, predicted_prob: Probability) -> Result<()> {
        sqlx::query(
            "INSERT INTO pending_predictions (game_id, predicted_prob, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(game_id) DO UPDATE SET
                predicted_prob = excluded.predicted_prob,
                created_at = excluded.created_at",
        )
        .bind(game_id)
        .bind(predicted_prob.value().to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_pending(&self) -> Result<Vec<(String, Probability)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT game_id, predicted_prob FROM pending_predictions ORDER BY game_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(game_id, p)| {
                let p = parse_probability(&game_id, &p)?;
                Ok((game_id, p))
            })
            .collect()
    }

    async fn append(&self, record: &CalibrationRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO calibration_log (game_id, predicted_prob, actual_outcome, recorded_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&record.game_id)
        .bind(record.predicted_prob.value().to_string())
        .bind(u8::from(record.actual_outcome) as i64)
        .bind(record.timestamp.to_rfc3339())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(Error::DuplicateRecord(record.game_id.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        sqlx::query("DELETE FROM pending_predictions WHERE game_id = ?")
            .bind(&record.game_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load_records(&self) -> Result<Vec<CalibrationRecord>> {
        let rows: Vec<(String, String, i64, String)> = sqlx::query_as(
            "SELECT game_id, predicted_prob, actual_outcome, recorded_at
             FROM calibration_log ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(game_id, p, outcome, ts)| {
                let predicted_prob = parse_probability(&game_id, &p)?;
                let actual_outcome = Outcome::try_from(outcome.clamp(0, u8::MAX as i64) as u8)?;
                Ok(CalibrationRecord {
                    timestamp: parse_timestamp(&ts)?,
                    game_id,
                    predicted_prob,
                    actual_outcome,
                })
            })
            .collect()
    }
}
