//! Bet recommendation from model predictions and market odds

pub mod kelly;


pub use kelly::{break_even_probability, full_kelly_fraction, KellySizer, KellySizing};

use crate::config::{BankrollConfig, Config};
use crate::error::{Error, Result};
use crate::types::{BetRecommendation, GameOdds, ModelPrediction, RiskTier, Side};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// A game dropped from the batch, with the reason
#[derive(Debug)]
pub struct SkippedGame {
    pub game_id: String,
    pub error: Error,
}

/// Ranked recommendations plus any games that could not be evaluated
#[derive(Debug, Default)]
pub struct RecommendationReport {
    pub recommendations: Vec<BetRecommendation>,
    pub skipped: Vec<SkippedGame>,
}

impl RecommendationReport {
    pub fn total_stake_fraction(&self) -> Decimal {
        self.recommendations.iter().map(|r| r.stake_fraction).sum()
    }

    pub fn total_expected_value(&self) -> Decimal {
        self.recommendations.iter().map(|r| r.expected_value).sum()
    }
}

/// Joins predictions with odds and emits edge-filtered, Kelly-sized bets
#[derive(Debug, Clone)]
pub struct BetRecommender {
    sizer: KellySizer,
    min_edge: Decimal,
    bankroll: BankrollConfig,
}

impl BetRecommender {
    pub fn new(sizer: KellySizer, min_edge: Decimal, bankroll: BankrollConfig) -> Self {
        Self {
            sizer,
            min_edge,
            bankroll,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            KellySizer::from_config(&config.kelly)?,
            config.recommend.min_edge,
            config.bankroll.clone(),
        ))
    }

    pub fn min_edge(&self) -> Decimal {
        self.min_edge
    }

    /// Evaluate both sides of one game
    ///
    /// A side is kept only if its edge reaches `min_edge` and the sized stake is
    /// positive.
    pub fn evaluate(&self, odds: &GameOdds, prediction: &ModelPrediction) -> Result<Vec<BetRecommendation>> {
        if odds.game_id != prediction.game_id {
            return Err(Error::missing(
                &odds.game_id,
                format!("prediction is for game {}", prediction.game_id),
            ));
        }

        let mut bets = Vec::with_capacity(2);
        for side in Side::BOTH {
            let moneyline = odds.moneyline(side);
            let converted = moneyline.convert();
            let p = prediction.probability_for(side);
            let edge = p.value() - converted.implied_probability;

            if edge < self.min_edge {
                continue;
            }

            let sizing = self.sizer.size(p, converted.payout_multiplier);
            if sizing.stake_fraction <= Decimal::ZERO {
                continue;
            }

            let stake_amount = (sizing.stake_fraction * self.bankroll.size).round_dp(2);
            let team = odds.team(side).to_string();
            bets.push(BetRecommendation {
                game_id: odds.game_id.clone(),
                side,
                pick: format!("{} ML ({})", team, moneyline),
                team,
                moneyline,
                stake_fraction: sizing.stake_fraction,
                kelly_fraction: sizing.full_kelly,
                predicted_prob: p.value(),
                implied_prob: converted.implied_probability,
                edge,
                stake_amount,
                expected_value: (stake_amount * edge).round_dp(2),
                risk: RiskTier::classify(
                    stake_amount,
                    self.bankroll.low_risk_max,
                    self.bankroll.medium_risk_max,
                ),
            });
        }
        Ok(bets)
    }

    /// Recommend from already-paired odds and predictions
    pub fn recommend(&self, pairs: &[(GameOdds, ModelPrediction)]) -> RecommendationReport {
        let mut report = RecommendationReport::default();

        for (odds, prediction) in pairs {
            match self.evaluate(odds, prediction) {
                Ok(bets) => report.recommendations.extend(bets),
                Err(e) => {
                    tracing::warn!("Skipping game {}: {}", odds.game_id, e);
                    report.skipped.push(SkippedGame {
                        game_id: odds.game_id.clone(),
                        error: e,
                    });
                }
            }
        }

        report.recommendations.sort_by(rank);
        tracing::info!(
            "{} recommendations from {} games ({} skipped)",
            report.recommendations.len(),
            pairs.len(),
            report.skipped.len()
        );
        report
    }

    /// Join odds and predictions by game id, then recommend
    ///
    /// Games present in only one input are reported as missing. Repeated game
    /// ids keep their first occurrence.
    pub fn recommend_slate(&self, odds: &[GameOdds], predictions: &[ModelPrediction]) -> RecommendationReport {
        let mut skipped = Vec::new();

        let mut by_id: BTreeMap<&str, &ModelPrediction> = BTreeMap::new();
        for prediction in predictions {
            if by_id.contains_key(prediction.game_id.as_str()) {
                skipped.push(SkippedGame {
                    game_id: prediction.game_id.clone(),
                    error: Error::missing(&prediction.game_id, "duplicate prediction ignored"),
                });
                continue;
            }
            by_id.insert(&prediction.game_id, prediction);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut pairs = Vec::with_capacity(odds.len());
        for game in odds {
            if !seen.insert(game.game_id.as_str()) {
                skipped.push(SkippedGame {
                    game_id: game.game_id.clone(),
                    error: Error::missing(&game.game_id, "duplicate odds entry ignored"),
                });
                continue;
            }
            match by_id.get(game.game_id.as_str()) {
                Some(prediction) => pairs.push((game.clone(), (*prediction).clone())),
                None => skipped.push(SkippedGame {
                    game_id: game.game_id.clone(),
                    error: Error::missing(&game.game_id, "no model prediction"),
                }),
            }
        }

        for id in by_id.keys() {
            if !seen.contains(id) {
                skipped.push(SkippedGame {
                    game_id: id.to_string(),
                    error: Error::missing(*id, "no odds"),
                });
            }
        }

        for s in &skipped {
            tracing::warn!("Skipping game {}: {}", s.game_id, s.error);
        }

        let mut report = self.recommend(&pairs);
        skipped.append(&mut report.skipped);
        report.skipped = skipped;
        report
    }
}

/// Stake descending, then edge descending, then game id and side
fn rank(a: &BetRecommendation, b: &BetRecommendation) -> Ordering {
    b.stake_fraction
        .cmp(&a.stake_fraction)
        .then_with(|| b.edge.cmp(&a.edge))
        .then_with(|| a.game_id.cmp(&b.game_id))
        .then_with(|| a.side.cmp(&b.side))
}
