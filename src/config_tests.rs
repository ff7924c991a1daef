//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::calibration::CalibrationMethod;
    use super::super::config::*;
    use super::super::error::Error;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kelly_config_default() {
        let config = KellyConfig::default();
        assert_eq!(config.fraction, dec!(0.25));
        assert_eq!(config.max_stake_pct, dec!(0.05));
    }

    #[test]
    fn test_bankroll_config_default() {
        let config = BankrollConfig::default();
        assert_eq!(config.size, dec!(130));
        assert_eq!(config.low_risk_max, dec!(15));
        assert_eq!(config.medium_risk_max, dec!(30));
    }

    #[test]
    fn test_calibration_config_defaults() {
        let config: CalibrationConfig = toml::from_str("").unwrap();
        assert_eq!(config.bin_count, 10);
        assert_eq!(config.method, CalibrationMethod::Isotonic);
        assert_eq!(config.min_samples, 30);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.recommend.min_edge, dec!(0.02));
        assert_eq!(config.paths.slate, "tomorrows_games_features.json");
        assert_eq!(config.database.path, "calibration_log.db");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
[kelly]
fraction = 0.5
max_stake_pct = 0.03

[recommend]
min_edge = 0.04

[bankroll]
size = 1000

[calibration]
method = "platt"
bin_count = 5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.kelly.fraction, dec!(0.5));
        assert_eq!(config.kelly.max_stake_pct, dec!(0.03));
        assert_eq!(config.recommend.min_edge, dec!(0.04));
        assert_eq!(config.bankroll.size, dec!(1000));
        assert_eq!(config.bankroll.low_risk_max, dec!(15)); // default kept
        assert_eq!(config.calibration.method, CalibrationMethod::Platt);
        assert_eq!(config.calibration.bin_count, 5);
    }

    #[test]
    fn test_sigmoid_alias() {
        let config: CalibrationConfig = toml::from_str(r#"method = "sigmoid""#).unwrap();
        assert_eq!(config.method, CalibrationMethod::Platt);
    }

    #[test]
    fn test_validate_rejects_bad_kelly() {
        let mut config = Config::default();
        config.kelly.fraction = dec!(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = Config::default();
        config.kelly.max_stake_pct = dec!(1.5);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_edge_and_bankroll() {
        let mut config = Config::default();
        config.recommend.min_edge = dec!(-0.01);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bankroll.size = dec!(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bankroll.low_risk_max = dec!(50);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_bins() {
        let mut config = Config::default();
        config.calibration.bin_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moneyline.toml");
        std::fs::write(
            &path,
            r#"
[kelly]
fraction = 0.5

[database]
path = "/tmp/log.db"
"#,
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.kelly.fraction, dec!(0.5));
        assert_eq!(config.kelly.max_stake_pct, dec!(0.05));
        assert_eq!(config.database.path, "/tmp/log.db");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.calibration.bin_count, 10);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[kelly]\nfraction = 2.0\n").unwrap();
        assert!(matches!(
            Config::load(path.to_str().unwrap()),
            Err(Error::InvalidConfig(_))
        ));
    }
}
