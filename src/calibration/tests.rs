//! Tests for calibration tracking

use super::*;
use chrono::TimeZone;
use rust_decimal_macros::dec;

fn prob(p: Decimal) -> Probability {
    Probability::new(p).unwrap()
}

/// Deterministic uniform draws in [0, 1)
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[test]
fn test_record_appends() {
    let mut tracker = CalibrationTracker::new();
    let ts = Utc.with_ymd_and_hms(2025, 6, 2, 4, 0, 0).unwrap();
    let rec = tracker
        .record_at("g1", prob(dec!(0.6)), Outcome::Win, ts)
        .unwrap()
        .clone();

    assert_eq!(rec.game_id, "g1");
    assert_eq!(rec.timestamp, ts);
    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.state("g1"), Some(RecordState::Finalized));
}

#[test]
fn test_record_rejects_duplicate() {
    let mut tracker = CalibrationTracker::new();
    tracker.record("g1", prob(dec!(0.6)), Outcome::Win).unwrap();

    let err = tracker.record("g1", prob(dec!(0.4)), Outcome::Loss).unwrap_err();
    assert!(matches!(err, Error::DuplicateRecord(ref id) if id == "g1"));
    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.records()[0].predicted_prob, prob(dec!(0.6)));
}

#[test]
fn test_pending_to_finalized_once() {
    let mut tracker = CalibrationTracker::new();
    tracker.track_pending("g1", prob(dec!(0.55))).unwrap();
    assert_eq!(tracker.state("g1"), Some(RecordState::Pending));
    assert_eq!(tracker.pending_count(), 1);

    let rec = tracker.finalize("g1", Outcome::Loss).unwrap();
    assert_eq!(rec.predicted_prob, prob(dec!(0.55)));
    assert_eq!(tracker.state("g1"), Some(RecordState::Finalized));
    assert_eq!(tracker.pending_count(), 0);

    assert!(matches!(
        tracker.finalize("g1", Outcome::Win),
        Err(Error::DuplicateRecord(_))
    ));
    assert!(matches!(
        tracker.track_pending("g1", prob(dec!(0.5))),
        Err(Error::DuplicateRecord(_))
    ));
}

#[test]
fn test_finalize_unknown_game() {
    let mut tracker = CalibrationTracker::new();
    assert!(matches!(
        tracker.finalize("nope", Outcome::Win),
        Err(Error::MissingGameData { .. })
    ));
    assert_eq!(tracker.state("nope"), None);
}

#[test]
fn test_prepare_finalize_leaves_state_until_commit() {
    let mut tracker = CalibrationTracker::new();
    let ts = Utc.with_ymd_and_hms(2025, 6, 2, 4, 0, 0).unwrap();
    tracker.track_pending("g1", prob(dec!(0.62))).unwrap();

    let rec = tracker.prepare_finalize("g1", Outcome::Win, ts).unwrap();
    assert_eq!(rec.predicted_prob, prob(dec!(0.62)));
    assert_eq!(tracker.state("g1"), Some(RecordState::Pending));
    assert!(tracker.is_empty());

    tracker.commit(rec).unwrap();
    assert_eq!(tracker.state("g1"), Some(RecordState::Finalized));
    assert_eq!(tracker.pending_count(), 0);
    assert!(matches!(
        tracker.prepare_finalize("g1", Outcome::Win, ts),
        Err(Error::DuplicateRecord(_))
    ));
}

#[test]
fn test_retracking_pending_replaces_probability() {
    let mut tracker = CalibrationTracker::new();
    tracker.track_pending("g1", prob(dec!(0.55))).unwrap();
    tracker.track_pending("g1", prob(dec!(0.58))).unwrap();
    assert_eq!(tracker.pending_count(), 1);
    assert_eq!(tracker.pending_probability("g1"), Some(prob(dec!(0.58))));
}

#[test]
fn test_from_parts_rejects_duplicate_records() {
    let ts = Utc::now();
    let rec = CalibrationRecord {
        game_id: "g1".to_string(),
        predicted_prob: prob(dec!(0.5)),
        actual_outcome: Outcome::Win,
        timestamp: ts,
    };
    assert!(CalibrationTracker::from_parts(vec![], vec![rec.clone(), rec.clone()]).is_err());

    // A pending entry for a finalized game is dropped
    let tracker =
        CalibrationTracker::from_parts(vec![("g1".to_string(), prob(dec!(0.4)))], vec![rec]).unwrap();
    assert_eq!(tracker.pending_count(), 0);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_metrics_bins() {
    let mut tracker = CalibrationTracker::new();
    tracker.record("a", prob(dec!(0.15)), Outcome::Win).unwrap();
    tracker.record("b", prob(dec!(0.12)), Outcome::Loss).unwrap();
    tracker.record("c", prob(dec!(0.65)), Outcome::Win).unwrap();
    tracker.record("d", prob(dec!(0.99)), Outcome::Win).unwrap();

    let m = tracker.compute_metrics(10).unwrap();
    assert_eq!(m.bin_count, 10);
    assert_eq!(m.sample_count, 4);
    assert_eq!(m.bins.len(), 3);

    assert_eq!(m.bins[0].index, 1);
    assert_eq!(m.bins[0].count, 2);
    assert_eq!(m.bins[0].mean_predicted, dec!(0.135));
    assert_eq!(m.bins[0].observed_rate, dec!(0.5));
    assert_eq!(m.bins[0].lower, dec!(0.1));
    assert_eq!(m.bins[0].upper, dec!(0.2));

    assert_eq!(m.bins[1].index, 6);
    assert_eq!(m.bins[2].index, 9);
    assert_eq!(m.bins[2].upper, Decimal::ONE);

    assert_eq!(m.base_rate, Some(dec!(0.75)));
}

#[test]
fn test_metrics_single_bin() {
    let mut tracker = CalibrationTracker::new();
    tracker.record("a", prob(dec!(0.2)), Outcome::Win).unwrap();
    tracker.record("b", prob(dec!(0.8)), Outcome::Loss).unwrap();
    let m = tracker.compute_metrics(1).unwrap();
    assert_eq!(m.bins.len(), 1);
    assert_eq!(m.bins[0].count, 2);
    assert_eq!(m.bins[0].mean_predicted, dec!(0.5));
}

#[test]
fn test_metrics_zero_bins_rejected() {
    let tracker = CalibrationTracker::new();
    assert!(matches!(tracker.compute_metrics(0), Err(Error::InvalidConfig(_))));
}

#[test]
fn test_metrics_empty_log() {
    let tracker = CalibrationTracker::new();
    let m = tracker.compute_metrics(10).unwrap();
    assert_eq!(m.sample_count, 0);
    assert!(m.bins.is_empty());
    assert_eq!(m.brier_score, None);
    assert_eq!(m.expected_calibration_error, None);
}

#[test]
fn test_brier_score_value() {
    let mut tracker = CalibrationTracker::new();
    tracker.record("a", prob(dec!(0.8)), Outcome::Win).unwrap();
    tracker.record("b", prob(dec!(0.3)), Outcome::Loss).unwrap();
    // (0.04 + 0.09) / 2
    assert_eq!(tracker.brier_score(), Some(dec!(0.065)));
}

#[test]
fn test_ece_perfect_bins() {
    let mut tracker = CalibrationTracker::new();
    for i in 0..10 {
        let outcome = Outcome::from(i < 5);
        tracker.record(&format!("g{}", i), prob(dec!(0.5)), outcome).unwrap();
    }
    let m = tracker.compute_metrics(10).unwrap();
    assert_eq!(m.expected_calibration_error, Some(Decimal::ZERO));
    assert_eq!(m.brier_score, Some(dec!(0.25)));
}

#[test]
fn test_constant_base_rate_predictor_brier_equals_variance() {
    // Predicting the base rate r every game gives Brier r(1 - r)
    let mut tracker = CalibrationTracker::new();
    for i in 0..100 {
        tracker
            .record(&format!("g{}", i), prob(dec!(0.54)), Outcome::from(i < 54))
            .unwrap();
    }
    assert_eq!(tracker.brier_score(), Some(dec!(0.54) * dec!(0.46)));
}

#[test]
fn test_calibrated_uniform_predictor_brier_converges() {
    // p ~ U(0, 1), outcome ~ Bernoulli(p): E[(p - o)^2] = E[p(1 - p)] = 1/6
    let mut rng = Lcg(42);
    let mut tracker = CalibrationTracker::new();
    for i in 0..20_000 {
        let p = rng.next_f64().clamp(0.001, 0.999);
        let won = rng.next_f64() < p;
        let p = Decimal::from_f64_retain(p).unwrap().round_dp(6);
        tracker
            .record(&format!("g{}", i), prob(p), Outcome::from(won))
            .unwrap();
    }
    let brier = tracker.brier_score().unwrap();
    assert!((brier - dec!(0.1667)).abs() < dec!(0.01), "brier = {}", brier);

    let m = tracker.compute_metrics(10).unwrap();
    assert_eq!(m.bins.len(), 10);
    assert!(m.expected_calibration_error.unwrap() < dec!(0.03));
}
