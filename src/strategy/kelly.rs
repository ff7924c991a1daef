//! Kelly criterion bet sizing
//!
//! Full Kelly for a bet paying `b` net per unit staked:
//!     f* = (p * b - q) / b = (p * (b + 1) - 1) / b
//!
//! Recommended stake is fractional Kelly clamped to the bankroll cap:
//!     f = clamp(k * f*, 0, c)
//!
//! A non-positive f* means no edge and yields a zero stake; short positions
//! are not modelled.

use crate::config::KellyConfig;
use crate::error::{Error, Result};
use crate::types::Probability;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sizing result for one bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KellySizing {
    /// Full Kelly fraction (negative when the bet has no edge)
    pub full_kelly: Decimal,
    /// Stake fraction in [0, cap]
    pub stake_fraction: Decimal,
}

/// Full Kelly fraction for win probability `p` and payout multiplier `b`
///
/// Returns zero when `b` is not positive.
pub fn full_kelly_fraction(p: Probability, payout_multiplier: Decimal) -> Decimal {
    if payout_multiplier <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (p.value() * (payout_multiplier + Decimal::ONE) - Decimal::ONE) / payout_multiplier
}

/// Break-even probability `1 / (1 + b)`; at or below it the stake is zero
pub fn break_even_probability(payout_multiplier: Decimal) -> Decimal {
    Decimal::ONE / (Decimal::ONE + payout_multiplier)
}

/// Fractional Kelly sizer with a hard stake cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KellySizer {
    kelly_multiplier: Decimal,
    max_stake: Decimal,
}

impl KellySizer {
    /// `kelly_multiplier` and `max_stake` must both be in (0, 1]
    pub fn new(kelly_multiplier: Decimal, max_stake: Decimal) -> Result<Self> {
        if kelly_multiplier <= Decimal::ZERO || kelly_multiplier > Decimal::ONE {
            return Err(Error::InvalidConfig(format!(
                "Kelly multiplier must be in (0, 1], got {}",
                kelly_multiplier
            )));
        }
        if max_stake <= Decimal::ZERO || max_stake > Decimal::ONE {
            return Err(Error::InvalidConfig(format!(
                "stake cap must be in (0, 1], got {}",
                max_stake
            )));
        }
        Ok(Self {
            kelly_multiplier,
            max_stake,
        })
    }

    pub fn from_config(config: &KellyConfig) -> Result<Self> {
        Self::new(config.fraction, config.max_stake_pct)
    }

    pub fn kelly_multiplier(&self) -> Decimal {
        self.kelly_multiplier
    }

    pub fn max_stake(&self) -> Decimal {
        self.max_stake
    }

    pub fn size(&self, p: Probability, payout_multiplier: Decimal) -> KellySizing {
        let full_kelly = full_kelly_fraction(p, payout_multiplier);
        let stake_fraction = if full_kelly <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            (full_kelly * self.kelly_multiplier).min(self.max_stake)
        };
        KellySizing {
            full_kelly,
            stake_fraction,
        }
    }

    /// Recommended stake fraction only
    pub fn stake_fraction(&self, p: Probability, payout_multiplier: Decimal) -> Decimal {
        self.size(p, payout_multiplier).stake_fraction
    }
}

impl Default for KellySizer {
    fn default() -> Self {
        let config = KellyConfig::default();
        Self {
            kelly_multiplier: config.fraction,
            max_stake: config.max_stake_pct,
        }
    }
}
