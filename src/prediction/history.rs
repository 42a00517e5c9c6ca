//! Back-calculated condition history.
//!
//! The decay rate implied by an entity's current value and age is run
//! backwards to reconstruct what the value was at earlier months.

use super::decay::decay_rate;
use crate::domain::YearMonth;
use crate::simulation::generator::round2;
use serde::Serialize;
use std::collections::BTreeSet;

const MONTHLY_SPAN: u32 = 24;
const QUARTERLY_SPAN: u32 = 120;

/// One reconstructed month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalPoint {
    /// `YYYY-MM`
    pub date: String,
    pub months_ago: u32,
    pub value: f64,
}

/// Months-ago offsets to sample for an entity of `age_months`, ascending.
///
/// Monthly for the last two years, quarterly to ten years, yearly beyond,
/// plus the construction month itself.
pub fn sample_points(age_months: u32) -> Vec<u32> {
    let monthly = 0..=MONTHLY_SPAN.min(age_months);
    let quarterly = (MONTHLY_SPAN + 3..=QUARTERLY_SPAN.min(age_months)).step_by(3);
    let yearly = (QUARTERLY_SPAN + 12..=age_months).step_by(12);

    monthly
        .chain(quarterly)
        .chain(yearly)
        .chain(std::iter::once(age_months))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Condition series from the construction month up to `reference`, oldest
/// first.
///
/// When no decay rate can be solved the series is flat at `current`.
pub fn historical_series(
    current: f64,
    construction_year: i32,
    initial: f64,
    reference: YearMonth,
) -> Vec<HistoricalPoint> {
    let age = reference.months_since_year(construction_year);
    if age == 0 {
        return vec![HistoricalPoint {
            date: reference.to_string(),
            months_ago: 0,
            value: round2(current),
        }];
    }

    let ratio = current / initial;
    let rate = if ratio > 0.0 && ratio < 1.0 {
        decay_rate(current, age, initial)
    } else {
        None
    };

    sample_points(age)
        .into_iter()
        .rev()
        .filter_map(|months_ago| {
            let date = reference.add_months(-i64::from(months_ago))?;
            let value = match rate {
                None => current,
                Some(rate) => {
                    let age_then = age - months_ago;
                    if age_then == 0 {
                        initial
                    } else {
                        initial * (1.0 - rate).powi(age_then as i32)
                    }
                }
            };
            Some(HistoricalPoint {
                date: date.to_string(),
                months_ago,
                value: round2(value),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_points_young_entity() {
        assert_eq!(sample_points(5), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(sample_points(0), vec![0]);
    }

    #[test]
    fn test_sample_points_adaptive_spacing() {
        let points = sample_points(200);
        assert_eq!(points.len(), 25 + 32 + 6 + 1);
        assert!(points.contains(&24));
        assert!(points.contains(&27));
        assert!(!points.contains(&25));
        assert!(points.contains(&120));
        assert!(points.contains(&132));
        assert!(!points.contains(&121));
        assert_eq!(points.last(), Some(&200));
    }

    #[test]
    fn test_series_runs_from_construction_to_reference() {
        let reference = YearMonth::new(2025, 6).unwrap();
        let series = historical_series(60.0, 2015, 99.99, reference);
        let first = series.first().unwrap();
        let last = series.last().unwrap();

        assert_eq!(first.date, "2015-01");
        assert_eq!(first.value, 99.99);
        assert_eq!(last.date, "2025-06");
        assert_eq!(last.months_ago, 0);
        assert_eq!(last.value, 60.0);
        assert!(series.windows(2).all(|w| w[0].value >= w[1].value));
    }

    #[test]
    fn test_series_flat_without_rate() {
        let reference = YearMonth::new(2025, 6).unwrap();
        let series = historical_series(99.995, 2020, 99.99, reference);
        assert!(series.len() > 1);
        assert!(series.iter().all(|p| p.value == round2(99.995)));
    }

    #[test]
    fn test_series_for_new_entity() {
        let reference = YearMonth::new(2025, 1).unwrap();
        let series = historical_series(95.0, 2025, 99.99, reference);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, "2025-01");
    }
}
