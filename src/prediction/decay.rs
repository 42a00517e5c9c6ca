//! Exponential decay model for condition values.
//!
//! A value starts at `initial` when the entity enters service and decays by a
//! constant fraction `r` per month: `value(t) = initial * (1 - r)^t`. The rate
//! is solved from the current value and age, then projected forward to the
//! month the value reaches the threshold.

use crate::config::Settings;
use crate::domain::{ConditionAged, YearMonth};
use crate::metrics::{METRICS, PredictionOutcome};
use serde::Serialize;

/// Longest forward trajectory, in months.
pub const MAX_TRAJECTORY_MONTHS: u32 = 120;

const EARLY_RATE_FACTOR: f64 = 1.5;
const LATE_RATE_FACTOR: f64 = 0.5;
const MAX_RATE: f64 = 0.9999;

/// Month a value reaches the threshold, and the value at that month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictedCrossing {
    pub year: i32,
    pub month: u8,
    pub value: f64,
}

impl PredictedCrossing {
    fn at(reference: YearMonth, value: f64) -> Self {
        Self {
            year: reference.year(),
            month: reference.month(),
            value,
        }
    }

    pub fn year_month(&self) -> Option<YearMonth> {
        YearMonth::new(self.year, self.month).ok()
    }
}

/// Monthly decay rate solving `current = initial * (1 - r)^age_months`.
///
/// `None` unless the rate is finite and strictly within (0, 1).
pub fn decay_rate(current: f64, age_months: u32, initial: f64) -> Option<f64> {
    if age_months == 0 || current <= 0.0 || initial <= 0.0 {
        return None;
    }
    let rate = 1.0 - (current / initial).powf(1.0 / f64::from(age_months));
    (rate.is_finite() && rate > 0.0 && rate < 1.0).then_some(rate)
}

/// Whole months until `current` decays to `threshold` at `rate`.
fn months_to_threshold(current: f64, threshold: f64, rate: f64) -> Option<i64> {
    let ratio = threshold / current;
    let base = 1.0 - rate;
    if !(ratio > 0.0 && base > 0.0) {
        return None;
    }
    let months = (ratio.ln() / base.ln()).round();
    months.is_finite().then_some(months as i64)
}

/// Predicts when `current` reaches `threshold`.
///
/// Values already at or below the threshold return the reference month with
/// the current value. Everything the model cannot solve returns `None`.
pub fn predict(
    current: f64,
    age_months: u32,
    initial: f64,
    threshold: f64,
    reference: YearMonth,
) -> Option<PredictedCrossing> {
    if current <= threshold {
        return Some(PredictedCrossing::at(reference, current));
    }
    let rate = decay_rate(current, age_months, initial)?;
    let months = months_to_threshold(current, threshold, rate)?;
    let crossing = reference.add_months(months)?;
    Some(PredictedCrossing::at(crossing, threshold))
}

/// Early, expected and late crossings from scaled decay rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossingRange {
    pub early: PredictedCrossing,
    pub expected: PredictedCrossing,
    pub late: PredictedCrossing,
}

/// One projected month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub months_ahead: u32,
    pub year: i32,
    pub month: u8,
    pub value: f64,
}

/// Degradation model parameters shared by every prediction of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegradationPredictor {
    initial_value: f64,
    threshold: f64,
    reference: YearMonth,
}

impl DegradationPredictor {
    pub fn new(initial_value: f64, threshold: f64, reference: YearMonth) -> Self {
        Self {
            initial_value,
            threshold,
            reference,
        }
    }

    /// Predictor using the configured initial value and threshold.
    pub fn from_settings(settings: &Settings, reference: YearMonth) -> Self {
        Self::new(
            settings.degradation.initial_condition,
            settings.degradation.threshold,
            reference,
        )
    }

    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn reference(&self) -> YearMonth {
        self.reference
    }

    pub fn predict_value(&self, current: f64, age_months: u32) -> Option<PredictedCrossing> {
        predict(
            current,
            age_months,
            self.initial_value,
            self.threshold,
            self.reference,
        )
    }

    /// Prediction for a facility or system, counted in `METRICS`.
    pub fn predict_entity<E: ConditionAged + ?Sized>(&self, entity: &E) -> Option<PredictedCrossing> {
        let current = entity.condition_value();
        let prediction = self.predict_value(current, entity.age_months(self.reference));
        let outcome = match prediction {
            _ if current <= self.threshold => PredictionOutcome::AlreadyDegraded,
            Some(_) => PredictionOutcome::Predicted,
            None => PredictionOutcome::NoPrediction,
        };
        METRICS.record_prediction(outcome);
        prediction
    }

    /// Crossings at 1.5x and 0.5x the solved rate around the expected one.
    ///
    /// An already degraded value yields the reference month for all three.
    pub fn predict_range(&self, current: f64, age_months: u32) -> Option<CrossingRange> {
        let expected = self.predict_value(current, age_months)?;
        if current <= self.threshold {
            return Some(CrossingRange {
                early: expected,
                expected,
                late: expected,
            });
        }
        let rate = decay_rate(current, age_months, self.initial_value)?;
        let crossing_at = |rate: f64| {
            let months = months_to_threshold(current, self.threshold, rate)?;
            let month = self.reference.add_months(months)?;
            Some(PredictedCrossing::at(month, self.threshold))
        };
        Some(CrossingRange {
            early: crossing_at((rate * EARLY_RATE_FACTOR).min(MAX_RATE))?,
            expected,
            late: crossing_at(rate * LATE_RATE_FACTOR)?,
        })
    }

    /// Projected monthly values, starting with `current` at the reference
    /// month (`months_ahead == 0`) and continuing until the threshold is
    /// reached, at most `MAX_TRAJECTORY_MONTHS` months ahead. Empty when the
    /// value is already degraded or no rate can be solved.
    pub fn trajectory(&self, current: f64, age_months: u32) -> Vec<TrajectoryPoint> {
        if current <= self.threshold {
            return Vec::new();
        }
        let Some(rate) = decay_rate(current, age_months, self.initial_value) else {
            return Vec::new();
        };

        let mut points = vec![TrajectoryPoint {
            months_ahead: 0,
            year: self.reference.year(),
            month: self.reference.month(),
            value: current,
        }];
        for months_ahead in 1..=MAX_TRAJECTORY_MONTHS {
            let Some(month) = self.reference.add_months(i64::from(months_ahead)) else {
                break;
            };
            let value = current * (1.0 - rate).powi(months_ahead as i32);
            points.push(TrajectoryPoint {
                months_ahead,
                year: month.year(),
                month: month.month(),
                value,
            });
            if value <= self.threshold {
                break;
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> YearMonth {
        YearMonth::new(2025, 6).unwrap()
    }

    #[test]
    fn test_already_degraded_returns_reference() {
        let crossing = predict(20.0, 100, 99.99, 25.0, reference()).unwrap();
        assert_eq!(crossing, PredictedCrossing { year: 2025, month: 6, value: 20.0 });
    }

    #[test]
    fn test_zero_age_has_no_prediction() {
        assert_eq!(predict(90.0, 0, 99.99, 25.0, reference()), None);
    }

    #[test]
    fn test_value_above_initial_has_no_prediction() {
        assert_eq!(predict(99.995, 12, 99.99, 25.0, reference()), None);
        assert_eq!(decay_rate(99.99, 12, 99.99), None);
    }

    #[test]
    fn test_valid_decay_predicts_future_month() {
        // halves every 120 months
        let crossing = predict(50.0, 120, 100.0, 25.0, reference()).unwrap();
        assert_eq!(crossing.value, 25.0);
        assert_eq!((crossing.year, crossing.month), (2035, 6));
    }

    #[test]
    fn test_non_positive_threshold_has_no_prediction() {
        assert_eq!(predict(50.0, 120, 100.0, 0.0, reference()), None);
    }

    #[test]
    fn test_range_orders_early_before_late() {
        let predictor = DegradationPredictor::new(100.0, 25.0, reference());
        let range = predictor.predict_range(50.0, 120).unwrap();
        let early = range.early.year_month().unwrap();
        let expected = range.expected.year_month().unwrap();
        let late = range.late.year_month().unwrap();
        assert!(early < expected);
        assert!(expected < late);
    }

    #[test]
    fn test_trajectory_ends_at_threshold() {
        let predictor = DegradationPredictor::new(100.0, 25.0, reference());
        let points = predictor.trajectory(30.0, 120);
        let last = points.last().unwrap();
        assert!(last.value <= 25.0);
        assert!(points[..points.len() - 1].iter().all(|p| p.value > 25.0));
        assert_eq!(points[1].months_ahead, 1);
        assert_eq!((points[1].year, points[1].month), (2025, 7));
    }

    #[test]
    fn test_trajectory_is_capped() {
        let predictor = DegradationPredictor::new(100.0, 1.0, reference());
        let points = predictor.trajectory(99.0, 600);
        assert_eq!(points.len(), MAX_TRAJECTORY_MONTHS as usize + 1);
        assert_eq!(points.last().unwrap().months_ahead, MAX_TRAJECTORY_MONTHS);
    }

    #[test]
    fn test_trajectory_starts_at_reference_month() {
        let predictor = DegradationPredictor::new(100.0, 25.0, reference());
        let points = predictor.trajectory(80.0, 60);
        let anchor = points[0];
        assert_eq!(anchor.months_ahead, 0);
        assert_eq!((anchor.year, anchor.month), (2025, 6));
        assert_eq!(anchor.value, 80.0);
    }
}
