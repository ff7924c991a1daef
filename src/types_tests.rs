//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::error::Error;
    use super::super::odds::Odds;
    use super::super::types::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn create_test_odds(home: i32, away: i32) -> GameOdds {
        GameOdds::new(
            "745123",
            "NYY",
            "BOS",
            Odds::american(home).unwrap(),
            Odds::american(away).unwrap(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_probability_bounds() {
        assert!(Probability::new(dec!(0.5)).is_ok());
        assert!(Probability::new(dec!(0.0001)).is_ok());
        assert!(matches!(Probability::new(dec!(0)), Err(Error::InvalidProbability(_))));
        assert!(matches!(Probability::new(dec!(1)), Err(Error::InvalidProbability(_))));
        assert!(Probability::new(dec!(-0.2)).is_err());
        assert!(Probability::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_probability_complement() {
        let p = Probability::new(dec!(0.62)).unwrap();
        assert_eq!(p.complement().value(), dec!(0.38));
    }

    #[test]
    fn test_probability_deserialize_validates() {
        let p: Probability = serde_json::from_str("\"0.55\"").unwrap();
        assert_eq!(p.value(), dec!(0.55));
        assert!(serde_json::from_str::<Probability>("\"1.5\"").is_err());
    }

    #[test]
    fn test_side_serialization() {
        assert_eq!(serde_json::to_string(&Side::Home).unwrap(), "\"home\"");
        let away: Side = serde_json::from_str("\"away\"").unwrap();
        assert_eq!(away, Side::Away);
    }

    #[test]
    fn test_game_odds_accessors() {
        let odds = create_test_odds(-135, 115);
        assert_eq!(odds.moneyline(Side::Home), Odds::American(-135));
        assert_eq!(odds.moneyline(Side::Away), Odds::American(115));
        assert_eq!(odds.team(Side::Away), "BOS");
        assert_eq!(odds.matchup(), "BOS @ NYY");
    }

    #[test]
    fn test_game_odds_rejects_empty_id() {
        let result = GameOdds::new(
            " ",
            "NYY",
            "BOS",
            Odds::American(100),
            Odds::American(100),
            Utc::now(),
        );
        assert!(matches!(result, Err(Error::MissingGameData { .. })));
    }

    #[test]
    fn test_prediction_away_is_complement() {
        let pred = ModelPrediction::new("745123", dec!(0.58)).unwrap();
        assert_eq!(pred.probability_for(Side::Home).value(), dec!(0.58));
        assert_eq!(pred.probability_for(Side::Away).value(), dec!(0.42));
        assert!(ModelPrediction::new("745123", dec!(1.2)).is_err());
    }

    #[test]
    fn test_risk_tier_boundaries() {
        let tier = |amount: Decimal| RiskTier::classify(amount, dec!(15), dec!(30));
        assert_eq!(tier(dec!(14.99)), RiskTier::Low);
        assert_eq!(tier(dec!(15)), RiskTier::Medium);
        assert_eq!(tier(dec!(30)), RiskTier::Medium);
        assert_eq!(tier(dec!(30.01)), RiskTier::High);
    }

    #[test]
    fn test_outcome_conversions() {
        assert_eq!(Outcome::try_from(0u8).unwrap(), Outcome::Loss);
        assert_eq!(Outcome::try_from(1u8).unwrap(), Outcome::Win);
        assert!(matches!(Outcome::try_from(2u8), Err(Error::InvalidOutcome(2))));
        assert_eq!(Outcome::Win.as_decimal(), Decimal::ONE);
        assert_eq!(serde_json::to_string(&Outcome::Win).unwrap(), "1");
        assert!(serde_json::from_str::<Outcome>("3").is_err());
    }

    #[test]
    fn test_game_outcome() {
        let mut game = GameOutcome {
            game_id: "745123".to_string(),
            home_runs: 3,
            away_runs: 3,
            is_final: true,
        };
        // A tied "final" is not a home win
        assert_eq!(game.home_outcome(), Some(Outcome::Loss));
        game.home_runs = 4;
        assert_eq!(game.home_outcome(), Some(Outcome::Win));
        game.is_final = false;
        assert_eq!(game.home_outcome(), None);
    }

    #[test]
    fn test_calibration_record_roundtrip() {
        let record = CalibrationRecord {
            game_id: "745123".to_string(),
            predicted_prob: Probability::new(dec!(0.61)).unwrap(),
            actual_outcome: Outcome::Win,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: CalibrationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
