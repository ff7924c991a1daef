//! Bookmaker odds conversion
//!
//! American moneylines:
//!     +150 -> implied 100 / 250 = 0.40, payout b = 1.50
//!     -120 -> implied 120 / 220 = 0.545, payout b = 100 / 120 = 0.833
//!
//! Decimal odds d (total return per unit staked):
//!     implied 1 / d, payout b = d - 1
//!
//! Implied probabilities assume zero bookmaker margin.

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validated bookmaker odds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "OddsInput", into = "String")]
pub enum Odds {
    /// Signed, non-zero American moneyline
    American(i32),
    /// Decimal odds, strictly greater than 1
    Decimal(Decimal),
}

/// Conversion result for a single side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedOdds {
    /// Market implied probability, in (0, 1)
    pub implied_probability: Decimal,
    /// Net profit per unit staked on a win, > 0
    pub payout_multiplier: Decimal,
}

impl Odds {
    pub fn american(moneyline: i32) -> Result<Self> {
        if moneyline == 0 {
            return Err(Error::InvalidOdds("American odds cannot be zero".to_string()));
        }
        Ok(Odds::American(moneyline))
    }

    pub fn decimal(odds: Decimal) -> Result<Self> {
        if odds <= Decimal::ONE {
            return Err(Error::InvalidOdds(format!(
                "decimal odds must be greater than 1, got {}",
                odds
            )));
        }
        Ok(Odds::Decimal(odds.normalize()))
    }

    /// Implied probability and payout multiplier
    pub fn convert(&self) -> ConvertedOdds {
        match *self {
            Odds::American(o) if o > 0 => {
                let o = Decimal::from(o);
                ConvertedOdds {
                    implied_probability: dec!(100) / (o + dec!(100)),
                    payout_multiplier: o / dec!(100),
                }
            }
            Odds::American(o) => {
                let neg = Decimal::from(-(o as i64));
                ConvertedOdds {
                    implied_probability: neg / (neg + dec!(100)),
                    payout_multiplier: dec!(100) / neg,
                }
            }
            Odds::Decimal(d) => ConvertedOdds {
                implied_probability: Decimal::ONE / d,
                payout_multiplier: d - Decimal::ONE,
            },
        }
    }

    pub fn implied_probability(&self) -> Decimal {
        self.convert().implied_probability
    }

    pub fn payout_multiplier(&self) -> Decimal {
        self.convert().payout_multiplier
    }

    /// Decimal-odds view (total return per unit staked)
    pub fn to_decimal_odds(&self) -> Decimal {
        self.payout_multiplier() + Decimal::ONE
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Odds::American(o) => write!(f, "{:+}", o),
            Odds::Decimal(d) => write!(f, "{:.2}", d),
        }
    }
}

impl FromStr for Odds {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.contains('.') {
            let d = Decimal::from_str(trimmed)
                .map_err(|e| Error::InvalidOdds(format!("'{}': {}", trimmed, e)))?;
            Odds::decimal(d)
        } else {
            let o = trimmed
                .trim_start_matches('+')
                .parse::<i32>()
                .map_err(|e| Error::InvalidOdds(format!("'{}': {}", trimmed, e)))?;
            Odds::american(o)
        }
    }
}

impl From<Odds> for String {
    fn from(odds: Odds) -> Self {
        odds.to_string()
    }
}

/// Odds as they appear in input files: an integer moneyline, a decimal
/// number, or text such as "+150"
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OddsInput {
    Int(i64),
    Float(f64),
    Text(String),
}

impl TryFrom<OddsInput> for Odds {
    type Error = Error;

    fn try_from(input: OddsInput) -> Result<Self> {
        match input {
            OddsInput::Int(o) => {
                let o = i32::try_from(o)
                    .map_err(|_| Error::InvalidOdds(format!("moneyline {} out of range", o)))?;
                Odds::american(o)
            }
            OddsInput::Float(d) => {
                let d = Decimal::try_from(d)
                    .map_err(|_| Error::InvalidOdds(format!("'{}' is not a finite number", d)))?;
                Odds::decimal(d)
            }
            OddsInput::Text(s) => s.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_moneyline() {
        let c = Odds::american(150).unwrap().convert();
        assert_eq!(c.implied_probability, dec!(0.4));
        assert_eq!(c.payout_multiplier, dec!(1.5));
    }

    #[test]
    fn test_minus_moneyline() {
        let c = Odds::american(-120).unwrap().convert();
        assert!((c.implied_probability - dec!(0.5455)).abs() < dec!(0.0001));
        assert!((c.payout_multiplier - dec!(0.8333)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_even_money() {
        for o in [100, -100] {
            let c = Odds::american(o).unwrap().convert();
            assert_eq!(c.implied_probability, dec!(0.5));
            assert_eq!(c.payout_multiplier, Decimal::ONE);
        }
    }

    #[test]
    fn test_zero_rejected() {
        assert!(matches!(Odds::american(0), Err(Error::InvalidOdds(_))));
    }

    #[test]
    fn test_valid_range_for_all_moneylines() {
        for o in (-2000..=2000).step_by(7).filter(|o| *o != 0) {
            let c = Odds::american(o).unwrap().convert();
            assert!(c.implied_probability > Decimal::ZERO);
            assert!(c.implied_probability < Decimal::ONE);
            assert!(c.payout_multiplier > Decimal::ZERO);
        }
        for o in [1, -1, i32::MAX, i32::MIN] {
            let c = Odds::american(o).unwrap().convert();
            assert!(c.implied_probability > Decimal::ZERO);
            assert!(c.implied_probability < Decimal::ONE);
            assert!(c.payout_multiplier > Decimal::ZERO);
        }
    }

    #[test]
    fn test_decimal_odds() {
        let c = Odds::decimal(dec!(2.5)).unwrap().convert();
        assert_eq!(c.implied_probability, dec!(0.4));
        assert_eq!(c.payout_multiplier, dec!(1.5));
        assert!(Odds::decimal(Decimal::ONE).is_err());
        assert!(Odds::decimal(dec!(0.5)).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!("+150".parse::<Odds>().unwrap(), Odds::American(150));
        assert_eq!("-120".parse::<Odds>().unwrap(), Odds::American(-120));
        assert_eq!(" 110 ".parse::<Odds>().unwrap(), Odds::American(110));
        assert_eq!("2.50".parse::<Odds>().unwrap(), Odds::Decimal(dec!(2.5)));
        assert!("0".parse::<Odds>().is_err());
        assert!("abc".parse::<Odds>().is_err());
        assert!("".parse::<Odds>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Odds::American(150).to_string(), "+150");
        assert_eq!(Odds::American(-120).to_string(), "-120");
        assert_eq!(Odds::Decimal(dec!(2.5)).to_string(), "2.50");
    }

    #[test]
    fn test_deserialize_inputs() {
        let o: Odds = serde_json::from_str("150").unwrap();
        assert_eq!(o, Odds::American(150));
        let o: Odds = serde_json::from_str("\"-110\"").unwrap();
        assert_eq!(o, Odds::American(-110));
        let o: Odds = serde_json::from_str("1.91").unwrap();
        assert_eq!(o, Odds::Decimal(dec!(1.91)));
        assert!(serde_json::from_str::<Odds>("0").is_err());
    }
}
