//! Probability recalibration
//!
//! Fits a monotone mapping from raw model probabilities to observed win
//! rates using the finalized calibration log:
//! - Platt scaling: sigmoid(a * logit(p) + b), fitted by Newton's method on
//!   log loss with Platt's smoothed targets
//! - Isotonic: pool-adjacent-violators step fit, linearly interpolated
//!   between block centroids
//!
//! Output is clamped to [0.001, 0.999] so calibrated values stay valid
//! probabilities.

use super::brier_score;
use crate::error::{Error, Result};
use crate::types::{CalibrationRecord, Probability};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

const OUTPUT_FLOOR: f64 = 0.001;
const OUTPUT_CEIL: f64 = 0.999;
const LOGIT_EPS: f64 = 1e-6;
const NEWTON_MAX_ITER: usize = 100;
const NEWTON_TOL: f64 = 1e-10;
const RIDGE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationMethod {
    #[serde(alias = "sigmoid")]
    Platt,
    #[default]
    Isotonic,
}

impl std::fmt::Display for CalibrationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationMethod::Platt => write!(f, "platt"),
            CalibrationMethod::Isotonic => write!(f, "isotonic"),
        }
    }
}

impl std::str::FromStr for CalibrationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "platt" | "sigmoid" => Ok(CalibrationMethod::Platt),
            "isotonic" => Ok(CalibrationMethod::Isotonic),
            other => Err(Error::InvalidConfig(format!("unknown calibration method '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum FittedCalibration {
    Platt { a: f64, b: f64 },
    Isotonic { x: Vec<f64>, y: Vec<f64> },
}

/// Brier score before and after recalibration on the same records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub method: CalibrationMethod,
    pub samples: usize,
    pub brier_before: Option<Decimal>,
    pub brier_after: Option<Decimal>,
}

/// Recalibration layer applied on top of raw model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityCalibrator {
    method: CalibrationMethod,
    min_samples: usize,
    sample_count: usize,
    fitted: Option<FittedCalibration>,
}

impl ProbabilityCalibrator {
    pub fn new(method: CalibrationMethod, min_samples: usize) -> Self {
        Self {
            method,
            min_samples,
            sample_count: 0,
            fitted: None,
        }
    }

    pub fn with_platt_scaling() -> Self {
        Self::new(CalibrationMethod::Platt, 30)
    }

    pub fn with_isotonic() -> Self {
        Self::new(CalibrationMethod::Isotonic, 30)
    }

    pub fn method(&self) -> CalibrationMethod {
        self.method
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Fit on finalized records
    pub fn fit(&mut self, records: &[CalibrationRecord]) -> Result<()> {
        if records.len() < self.min_samples {
            return Err(Error::InsufficientData {
                required: self.min_samples,
                available: records.len(),
            });
        }

        let samples: Vec<(f64, f64)> = records
            .iter()
            .map(|r| {
                let p = r.predicted_prob.value().to_f64().unwrap_or(0.5);
                let y = if r.actual_outcome.is_win() { 1.0 } else { 0.0 };
                (p, y)
            })
            .collect();

        let fitted = match self.method {
            CalibrationMethod::Platt => {
                let (a, b) = fit_platt(&samples);
                FittedCalibration::Platt { a, b }
            }
            CalibrationMethod::Isotonic => {
                let (x, y) = fit_isotonic(&samples);
                FittedCalibration::Isotonic { x, y }
            }
        };

        tracing::info!("Fitted {} calibration on {} samples", self.method, samples.len());
        self.fitted = Some(fitted);
        self.sample_count = samples.len();
        Ok(())
    }

    /// Map a raw probability; identity until fitted
    pub fn calibrate(&self, p: Probability) -> Probability {
        let Some(fitted) = &self.fitted else {
            return p;
        };
        let raw = p.value().to_f64().unwrap_or(0.5);
        let out = match fitted {
            FittedCalibration::Platt { a, b } => sigmoid(a * logit(raw) + b),
            FittedCalibration::Isotonic { x, y } => interpolate(x, y, raw),
        };
        let clamped = out.clamp(OUTPUT_FLOOR, OUTPUT_CEIL);
        Decimal::from_f64(clamped)
            .map(|d| d.round_dp(6))
            .and_then(|d| Probability::new(d).ok())
            .unwrap_or(p)
    }

    /// Brier score of the raw and recalibrated probabilities
    pub fn evaluate(&self, records: &[CalibrationRecord]) -> CalibrationReport {
        let before = brier_score(records.iter().map(|r| (r.predicted_prob.value(), r.actual_outcome)));
        let after = brier_score(
            records
                .iter()
                .map(|r| (self.calibrate(r.predicted_prob).value(), r.actual_outcome)),
        );
        CalibrationReport {
            method: self.method,
            samples: records.len(),
            brier_before: before,
            brier_after: after,
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&data)?)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    (p / (1.0 - p)).ln()
}

fn log_loss(samples: &[(f64, f64)], a: f64, b: f64) -> f64 {
    samples
        .iter()
        .map(|(x, t)| {
            let q = sigmoid(a * x + b).clamp(1e-15, 1.0 - 1e-15);
            -(t * q.ln() + (1.0 - t) * (1.0 - q).ln())
        })
        .sum()
}

/// Returns (a, b) for sigmoid(a * logit(p) + b)
fn fit_platt(samples: &[(f64, f64)]) -> (f64, f64) {
    let positives = samples.iter().filter(|(_, y)| *y > 0.5).count() as f64;
    let negatives = samples.len() as f64 - positives;
    let hi = (positives + 1.0) / (positives + 2.0);
    let lo = 1.0 / (negatives + 2.0);

    let data: Vec<(f64, f64)> = samples
        .iter()
        .map(|(p, y)| (logit(*p), if *y > 0.5 { hi } else { lo }))
        .collect();

    let (mut a, mut b) = (1.0, 0.0);
    let mut loss = log_loss(&data, a, b);

    for _ in 0..NEWTON_MAX_ITER {
        let (mut ga, mut gb) = (0.0, 0.0);
        let (mut haa, mut hab, mut hbb) = (RIDGE, 0.0, RIDGE);
        for (x, t) in &data {
            let q = sigmoid(a * x + b);
            let w = q * (1.0 - q);
            ga += (q - t) * x;
            gb += q - t;
            haa += w * x * x;
            hab += w * x;
            hbb += w;
        }

        let det = haa * hbb - hab * hab;
        if det.abs() < f64::EPSILON {
            break;
        }
        let da = (hbb * ga - hab * gb) / det;
        let db = (haa * gb - hab * ga) / det;

        let mut step = 1.0;
        let mut improved = false;
        for _ in 0..20 {
            let (na, nb) = (a - step * da, b - step * db);
            let new_loss = log_loss(&data, na, nb);
            if new_loss <= loss {
                a = na;
                b = nb;
                improved = (loss - new_loss) > NEWTON_TOL;
                loss = new_loss;
                break;
            }
            step /= 2.0;
        }
        if !improved {
            break;
        }
    }

    (a, b)
}

/// Pool-adjacent-violators; returns block centroids and fitted values
fn fit_isotonic(samples: &[(f64, f64)]) -> (Vec<f64>, Vec<f64>) {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|l, r| l.0.total_cmp(&r.0));

    // (sum_x, sum_y, weight)
    let mut blocks: Vec<(f64, f64, f64)> = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        // tied predictions form a single point
        let x = sorted[i].0;
        let (mut sum_y, mut w) = (0.0, 0.0);
        while i < sorted.len() && sorted[i].0 == x {
            sum_y += sorted[i].1;
            w += 1.0;
            i += 1;
        }
        blocks.push((x * w, sum_y, w));

        while blocks.len() > 1 {
            let n = blocks.len();
            let (px, py, pw) = blocks[n - 2];
            let (lx, ly, lw) = blocks[n - 1];
            if py / pw <= ly / lw {
                break;
            }
            blocks.truncate(n - 2);
            blocks.push((px + lx, py + ly, pw + lw));
        }
    }

    blocks
        .into_iter()
        .map(|(sx, sy, w)| (sx / w, sy / w))
        .unzip()
}

fn interpolate(x: &[f64], y: &[f64], p: f64) -> f64 {
    if x.is_empty() {
        return p;
    }
    if p <= x[0] {
        return y[0];
    }
    let last = x.len() - 1;
    if p >= x[last] {
        return y[last];
    }
    let hi = x.partition_point(|v| *v <= p);
    let lo = hi - 1;
    let span = x[hi] - x[lo];
    if span <= 0.0 {
        return y[lo];
    }
    y[lo] + (y[hi] - y[lo]) * (p - x[lo]) / span
}
