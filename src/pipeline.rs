//! Daily pipeline
//!
//! ```text
//! slate (features + odds) -> model -> recalibration -> BetRecommender -> bets
//!                                 \-> pending predictions
//! outcomes -> finalize pending -> calibration log -> metrics
//! ```

use crate::calibration::{CalibrationMetrics, CalibrationTracker, ProbabilityCalibrator};
use crate::data::SlateGame;
use crate::error::{Error, Result};
use crate::model::ProbabilityModel;
use crate::storage::CalibrationStore;
use crate::strategy::{BetRecommender, RecommendationReport, SkippedGame};
use crate::types::{CalibrationRecord, GameOdds, GameOutcome, ModelPrediction, Probability};
use chrono::Utc;

/// Result of a prediction run
#[derive(Debug, Default)]
pub struct DailyRun {
    /// Probabilities used for sizing (after recalibration)
    pub predictions: Vec<ModelPrediction>,
    pub report: RecommendationReport,
}

/// Result of logging outcomes
#[derive(Debug, Default)]
pub struct OutcomeSummary {
    pub finalized: Vec<CalibrationRecord>,
    pub skipped: Vec<SkippedGame>,
    /// Games reported but not yet final
    pub not_final: usize,
}

pub struct PipelineDriver<S: CalibrationStore> {
    model: Box<dyn ProbabilityModel>,
    calibrator: Option<ProbabilityCalibrator>,
    recommender: BetRecommender,
    store: S,
    tracker: CalibrationTracker,
}

impl<S: CalibrationStore> PipelineDriver<S> {
    /// Build the driver and hydrate the tracker from the store
    pub async fn new(
        model: Box<dyn ProbabilityModel>,
        calibrator: Option<ProbabilityCalibrator>,
        recommender: BetRecommender,
        store: S,
    ) -> Result<Self> {
        let pending = store.load_pending().await?;
        let records = store.load_records().await?;
        let tracker = CalibrationTracker::from_parts(pending, records)?;
        tracing::info!(
            "Calibration log: {} finalized, {} pending",
            tracker.len(),
            tracker.pending_count()
        );
        Ok(Self {
            model,
            calibrator,
            recommender,
            store,
            tracker,
        })
    }

    pub fn tracker(&self) -> &CalibrationTracker {
        &self.tracker
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Predict every game, register pending predictions, and size bets
    ///
    /// The calibration log receives the raw model probability; bets are sized
    /// on the recalibrated one.
    pub async fn run_predictions(&mut self, slate: &[SlateGame]) -> Result<DailyRun> {
        let mut skipped = Vec::new();
        let mut predictions = Vec::with_capacity(slate.len());
        let mut odds: Vec<GameOdds> = Vec::with_capacity(slate.len());

        for game in slate {
            let game_id = &game.features.game_id;
            let raw = match self.predict_one(game).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("Skipping game {}: {}", game_id, e);
                    skipped.push(SkippedGame {
                        game_id: game_id.clone(),
                        error: e,
                    });
                    continue;
                }
            };

            match self.tracker.track_pending(game_id, raw) {
                Ok(()) => self.store.save_pending(game_id, raw).await?,
                Err(e) => tracing::warn!("Not tracking {}: {}", game_id, e),
            }

            let served = match &self.calibrator {
                Some(c) => c.calibrate(raw),
                None => raw,
            };
            tracing::debug!(
                "{} {}: raw={} served={}",
                self.model.name(),
                game_id,
                raw,
                served
            );

            predictions.push(ModelPrediction {
                game_id: game_id.clone(),
                predicted_home_win_prob: served,
            });
            odds.push(game.odds.clone());
        }

        let mut report = self.recommender.recommend_slate(&odds, &predictions);
        skipped.append(&mut report.skipped);
        report.skipped = skipped;

        Ok(DailyRun {
            predictions,
            report,
        })
    }

    async fn predict_one(&self, game: &SlateGame) -> Result<Probability> {
        if game.features.game_id != game.odds.game_id {
            return Err(Error::missing(
                &game.features.game_id,
                format!("odds are for game {}", game.odds.game_id),
            ));
        }
        let raw = self.model.predict(&game.features).await?;
        Probability::new(raw)
    }

    /// Finalize pending predictions with final scores
    pub async fn log_outcomes(&mut self, outcomes: &[GameOutcome]) -> Result<OutcomeSummary> {
        let mut summary = OutcomeSummary::default();

        for game in outcomes {
            let Some(outcome) = game.home_outcome() else {
                summary.not_final += 1;
                continue;
            };

            // Persist before committing so the tracker never runs ahead of the store
            let persisted = match self.tracker.prepare_finalize(&game.game_id, outcome, Utc::now()) {
                Ok(record) => self.store.append(&record).await.map(|()| record),
                Err(e) => Err(e),
            };
            let record = match persisted {
                Ok(record) => record,
                Err(e) if e.is_per_game() => {
                    tracing::warn!("Not logging {}: {}", game.game_id, e);
                    summary.skipped.push(SkippedGame {
                        game_id: game.game_id.clone(),
                        error: e,
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };
            summary.finalized.push(self.tracker.commit(record)?.clone());
        }

        tracing::info!(
            "Logged {} outcomes ({} skipped, {} not final)",
            summary.finalized.len(),
            summary.skipped.len(),
            summary.not_final
        );
        Ok(summary)
    }

    pub fn metrics(&self, bin_count: usize) -> Result<CalibrationMetrics> {
        self.tracker.compute_metrics(bin_count)
    }
}
