//! Calibration tracking
//!
//! Keeps an append-only log of (predicted probability, outcome) pairs and
//! derives calibration metrics from it:
//! - Reliability curve over equal-width probability bins
//! - Brier score
//! - Expected calibration error
//!
//! Each game moves PENDING -> FINALIZED exactly once. Finalized records are
//! never mutated; metrics are always recomputed from the full log.

pub mod recalibrate;

#[cfg(test)]
mod tests;

pub use recalibrate::{CalibrationMethod, CalibrationReport, ProbabilityCalibrator};

use crate::error::{Error, Result};
use crate::types::{CalibrationRecord, Outcome, Probability};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Lifecycle of a tracked game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    Finalized,
}

/// One reliability-curve bin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub index: usize,
    pub lower: Decimal,
    pub upper: Decimal,
    pub mean_predicted: Decimal,
    pub observed_rate: Decimal,
    pub count: usize,
}

/// Derived view over the calibration log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationMetrics {
    pub bin_count: usize,
    pub sample_count: usize,
    /// Non-empty bins only, in ascending probability order
    pub bins: Vec<CalibrationBin>,
    pub brier_score: Option<Decimal>,
    /// Count-weighted mean |mean_predicted - observed_rate|
    pub expected_calibration_error: Option<Decimal>,
    /// Fraction of home wins
    pub base_rate: Option<Decimal>,
}

/// Mean squared error between probabilities and binary outcomes
///
/// `None` for an empty input.
pub fn brier_score<I>(pairs: I) -> Option<Decimal>
where
    I: IntoIterator<Item = (Decimal, Outcome)>,
{
    let mut total = Decimal::ZERO;
    let mut n = 0u64;
    for (p, outcome) in pairs {
        let diff = p - outcome.as_decimal();
        total += diff * diff;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(total / Decimal::from(n))
    }
}

/// Bin index for `p` among `bin_count` equal-width bins over [0, 1]
fn bin_index(p: Decimal, bin_count: usize) -> usize {
    let idx = (p * Decimal::from(bin_count))
        .floor()
        .to_usize()
        .unwrap_or(0);
    idx.min(bin_count - 1)
}

/// In-memory calibration log with pending predictions
#[derive(Debug, Clone, Default)]
pub struct CalibrationTracker {
    pending: BTreeMap<String, Probability>,
    records: Vec<CalibrationRecord>,
    finalized: HashSet<String>,
}

impl CalibrationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted state
    pub fn from_parts(
        pending: impl IntoIterator<Item = (String, Probability)>,
        records: impl IntoIterator<Item = CalibrationRecord>,
    ) -> Result<Self> {
        let mut tracker = Self::new();
        for record in records {
            tracker.commit(record)?;
        }
        for (game_id, p) in pending {
            if !tracker.finalized.contains(&game_id) {
                tracker.pending.insert(game_id, p);
            }
        }
        Ok(tracker)
    }

    /// Register a prediction awaiting its outcome
    ///
    /// Re-tracking a pending game replaces its probability.
    pub fn track_pending(&mut self, game_id: &str, predicted_prob: Probability) -> Result<()> {
        if self.finalized.contains(game_id) {
            return Err(Error::DuplicateRecord(game_id.to_string()));
        }
        self.pending.insert(game_id.to_string(), predicted_prob);
        Ok(())
    }

    /// Move a pending game to FINALIZED with its outcome
    pub fn finalize(&mut self, game_id: &str, outcome: Outcome) -> Result<&CalibrationRecord> {
        self.finalize_at(game_id, outcome, Utc::now())
    }

    pub fn finalize_at(
        &mut self,
        game_id: &str,
        outcome: Outcome,
        timestamp: DateTime<Utc>,
    ) -> Result<&CalibrationRecord> {
        let record = self.prepare_finalize(game_id, outcome, timestamp)?;
        self.commit(record)
    }

    /// Build the record `finalize_at` would append, without changing state
    ///
    /// Lets callers persist the record first and `commit` it afterwards.
    pub fn prepare_finalize(
        &self,
        game_id: &str,
        outcome: Outcome,
        timestamp: DateTime<Utc>,
    ) -> Result<CalibrationRecord> {
        if self.finalized.contains(game_id) {
            return Err(Error::DuplicateRecord(game_id.to_string()));
        }
        let predicted_prob = self
            .pending
            .get(game_id)
            .copied()
            .ok_or_else(|| Error::missing(game_id, "no pending prediction"))?;
        Ok(CalibrationRecord {
            game_id: game_id.to_string(),
            predicted_prob,
            actual_outcome: outcome,
            timestamp,
        })
    }

    /// Append a finalized record stamped with the current time
    pub fn record(
        &mut self,
        game_id: &str,
        predicted_prob: Probability,
        actual_outcome: Outcome,
    ) -> Result<&CalibrationRecord> {
        self.record_at(game_id, predicted_prob, actual_outcome, Utc::now())
    }

    pub fn record_at(
        &mut self,
        game_id: &str,
        predicted_prob: Probability,
        actual_outcome: Outcome,
        timestamp: DateTime<Utc>,
    ) -> Result<&CalibrationRecord> {
        self.commit(CalibrationRecord {
            game_id: game_id.to_string(),
            predicted_prob,
            actual_outcome,
            timestamp,
        })
    }

    /// Append a finalized record, clearing any pending entry for the game
    pub fn commit(&mut self, record: CalibrationRecord) -> Result<&CalibrationRecord> {
        if !self.finalized.insert(record.game_id.clone()) {
            return Err(Error::DuplicateRecord(record.game_id));
        }
        self.pending.remove(&record.game_id);
        tracing::debug!(
            "Finalized {}: p={} outcome={}",
            record.game_id,
            record.predicted_prob,
            u8::from(record.actual_outcome)
        );
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    pub fn state(&self, game_id: &str) -> Option<RecordState> {
        if self.finalized.contains(game_id) {
            Some(RecordState::Finalized)
        } else if self.pending.contains_key(game_id) {
            Some(RecordState::Pending)
        } else {
            None
        }
    }

    pub fn pending_probability(&self, game_id: &str) -> Option<Probability> {
        self.pending.get(game_id).copied()
    }

    pub fn records(&self) -> &[CalibrationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn brier_score(&self) -> Option<Decimal> {
        brier_score(
            self.records
                .iter()
                .map(|r| (r.predicted_prob.value(), r.actual_outcome)),
        )
    }

    pub fn compute_metrics(&self, bin_count: usize) -> Result<CalibrationMetrics> {
        if bin_count == 0 {
            return Err(Error::InvalidConfig("bin count must be at least 1".to_string()));
        }

        // (sum predicted, wins, count) per bin
        let mut acc = vec![(Decimal::ZERO, 0usize, 0usize); bin_count];
        let mut wins = 0usize;
        for r in &self.records {
            let p = r.predicted_prob.value();
            let slot = &mut acc[bin_index(p, bin_count)];
            slot.0 += p;
            slot.2 += 1;
            if r.actual_outcome.is_win() {
                slot.1 += 1;
                wins += 1;
            }
        }

        let width = Decimal::ONE / Decimal::from(bin_count);
        let bins: Vec<CalibrationBin> = acc
            .into_iter()
            .enumerate()
            .filter(|(_, (_, _, count))| *count > 0)
            .map(|(index, (sum, bin_wins, count))| {
                let n = Decimal::from(count);
                CalibrationBin {
                    index,
                    lower: width * Decimal::from(index),
                    upper: if index + 1 == bin_count {
                        Decimal::ONE
                    } else {
                        width * Decimal::from(index + 1)
                    },
                    mean_predicted: sum / n,
                    observed_rate: Decimal::from(bin_wins) / n,
                    count,
                }
            })
            .collect();

        let sample_count = self.records.len();
        let (ece, base_rate) = if sample_count == 0 {
            (None, None)
        } else {
            let total = Decimal::from(sample_count);
            let ece: Decimal = bins
                .iter()
                .map(|b| (b.mean_predicted - b.observed_rate).abs() * Decimal::from(b.count))
                .sum::<Decimal>()
                / total;
            (Some(ece), Some(Decimal::from(wins) / total))
        };

        Ok(CalibrationMetrics {
            bin_count,
            sample_count,
            bins,
            brier_score: self.brier_score(),
            expected_calibration_error: ece,
            base_rate,
        })
    }
}
