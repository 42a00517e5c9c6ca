use super::dataset::GeneratedDataset;
use crate::domain::{DependencyTier, ResiliencyGrade};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConditionStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Entities at or below the degradation threshold
    pub degraded: usize,
}

impl ConditionStats {
    fn compute(values: impl IntoIterator<Item = f64>, threshold: f64) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut degraded = 0usize;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
            if value <= threshold {
                degraded += 1;
            }
        }
        if count == 0 {
            return Self {
                count,
                mean: 0.0,
                min: 0.0,
                max: 0.0,
                degraded,
            };
        }
        Self {
            count,
            mean: sum / count as f64,
            min,
            max,
            degraded,
        }
    }
}

/// Aggregate figures over a generated dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub installations: usize,
    pub facilities: usize,
    pub systems: usize,
    pub promoted_facilities: usize,
    pub tiers: BTreeMap<DependencyTier, usize>,
    pub grades: BTreeMap<ResiliencyGrade, usize>,
    pub installation_condition: ConditionStats,
    pub facility_condition: ConditionStats,
    pub system_condition: ConditionStats,
}

impl DatasetSummary {
    pub fn compute(dataset: &GeneratedDataset, threshold: f64) -> Self {
        let facilities = dataset.facilities().values();

        let mut tiers = BTreeMap::new();
        let mut grades = BTreeMap::new();
        let mut promoted_facilities = 0;
        for facility in facilities.clone() {
            *tiers.entry(facility.tier()).or_insert(0) += 1;
            *grades.entry(facility.resiliency()).or_insert(0) += 1;
            if facility.was_promoted() {
                promoted_facilities += 1;
            }
        }

        Self {
            installations: dataset.installations().len(),
            facilities: dataset.facilities().len(),
            systems: dataset.systems().len(),
            promoted_facilities,
            tiers,
            grades,
            installation_condition: ConditionStats::compute(
                dataset.installations().values().map(|i| i.condition()),
                threshold,
            ),
            facility_condition: ConditionStats::compute(
                facilities.map(|f| f.condition()),
                threshold,
            ),
            system_condition: ConditionStats::compute(
                dataset.systems().values().map(|s| s.condition()),
                threshold,
            ),
        }
    }

    pub fn tier_count(&self, tier: DependencyTier) -> usize {
        self.tiers.get(&tier).copied().unwrap_or(0)
    }

    pub fn grade_count(&self, grade: ResiliencyGrade) -> usize {
        self.grades.get(&grade).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::{ReferenceData, YearMonth};
    use crate::simulation::{ExecutionMode, HierarchyGenerator};
    use std::sync::Arc;

    #[test]
    fn test_condition_stats_empty() {
        let stats = ConditionStats::compute(Vec::new(), 25.0);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
    }

    #[test]
    fn test_condition_stats_degraded() {
        let stats = ConditionStats::compute(vec![10.0, 25.0, 60.0, 90.0], 25.0);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.degraded, 2);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 90.0);
        assert!((stats.mean - 46.25).abs() < 1e-9);
    }

    #[test]
    fn test_summary_counts_match_dataset() {
        let generator = HierarchyGenerator::new(
            Arc::new(Settings::default()),
            Arc::new(ReferenceData::builtin()),
            YearMonth::new(2025, 1).unwrap(),
        )
        .unwrap();
        let dataset = generator
            .generate_installations(5, 11, ExecutionMode::Sequential)
            .unwrap();
        let summary = DatasetSummary::compute(&dataset, 25.0);

        assert_eq!(summary.installations, 5);
        assert_eq!(summary.tiers.values().sum::<usize>(), summary.facilities);
        assert_eq!(summary.grades.values().sum::<usize>(), summary.facilities);
        assert_eq!(summary.system_condition.count, summary.systems);
        assert!(summary.promoted_facilities <= summary.facilities);

        let primaries = dataset
            .facilities()
            .values()
            .filter(|f| f.tier() == DependencyTier::Primary)
            .count();
        assert_eq!(summary.tier_count(DependencyTier::Primary), primaries);
        let graded: usize = ResiliencyGrade::BEST_FIRST
            .into_iter()
            .map(|grade| summary.grade_count(grade))
            .sum();
        assert_eq!(graded, summary.facilities);
    }

    #[test]
    fn test_missing_keys_count_zero() {
        let summary = DatasetSummary::compute(
            &GeneratedDataset::from_bundles(1, YearMonth::new(2025, 1).unwrap(), Vec::new())
                .unwrap(),
            25.0,
        );
        assert_eq!(summary.tier_count(DependencyTier::Tertiary), 0);
        assert_eq!(summary.grade_count(ResiliencyGrade::G4), 0);
    }
}
